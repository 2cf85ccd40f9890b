use crate::{DistanceFunction, Primitive};

/// Squared euclidean distance. The square root is skipped since it does not change the ordering.
pub struct EuclideanDistance;

impl<T: Primitive> DistanceFunction<T> for EuclideanDistance {
    #[inline(always)]
    fn distance(&self, a: &[T], b: &[T]) -> T {
        a.iter().zip(b.iter())
            .map(|(&sp, &cp)| sp - cp)  // <sample> - <centroid>
            .map(|v| v * v)             // <vec_components> ^2
            .sum()
    }
}
