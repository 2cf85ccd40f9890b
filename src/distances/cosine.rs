use crate::{DistanceFunction, Primitive};

/// `1 - cos(a, b)`, ranging from 0 (same direction) to 2 (opposite direction).
/// A zero vector has no direction and is at distance 1 from everything.
pub struct CosineDistance;

impl<T: Primitive> DistanceFunction<T> for CosineDistance {
    #[inline(always)]
    fn distance(&self, a: &[T], b: &[T]) -> T {
        let mut dot = T::zero();
        let mut norm_a = T::zero();
        let mut norm_b = T::zero();
        for (&x, &y) in a.iter().zip(b.iter()) {
            dot += x * y;
            norm_a += x * x;
            norm_b += y * y;
        }
        if norm_a == T::zero() || norm_b == T::zero() {
            return T::one();
        }
        T::one() - dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_only() {
        assert_approx_eq!(CosineDistance.distance(&[1.0f64, 0.0], &[5.0, 0.0]), 0.0);
        assert_approx_eq!(CosineDistance.distance(&[1.0f64, 0.0], &[0.0, 2.0]), 1.0);
        assert_approx_eq!(CosineDistance.distance(&[1.0f64, 1.0], &[-1.0, -1.0]), 2.0);
    }

    #[test]
    fn zero_vector() {
        assert_eq!(CosineDistance.distance(&[0.0f32, 0.0], &[1.0, 1.0]), 1.0);
    }
}
