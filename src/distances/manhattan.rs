use crate::{DistanceFunction, Primitive};

pub struct ManhattanDistance;

impl<T: Primitive> DistanceFunction<T> for ManhattanDistance {
    #[inline(always)]
    fn distance(&self, a: &[T], b: &[T]) -> T {
        a.iter().zip(b.iter())
            .map(|(&x, &y)| (x - y).abs())
            .sum()
    }
}
