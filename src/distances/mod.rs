mod cosine;
mod euclidean;
mod manhattan;

pub use cosine::CosineDistance;
pub use euclidean::EuclideanDistance;
pub use manhattan::ManhattanDistance;

use crate::config::Metric;
use crate::Primitive;

/// Dissimilarity between two points of equal dimensionality. Smaller is closer.
pub trait DistanceFunction<T: Primitive>: Sync + Send {
    fn distance(&self, a: &[T], b: &[T]) -> T;
}

impl<T: Primitive> DistanceFunction<T> for Metric {
    #[inline(always)]
    fn distance(&self, a: &[T], b: &[T]) -> T {
        match self {
            Metric::Euclidean => EuclideanDistance.distance(a, b),
            Metric::Manhattan => ManhattanDistance.distance(a, b),
            Metric::Cosine => CosineDistance.distance(a, b),
        }
    }
}

/// Index of the centroid closest to **point**. Ties resolve to the lowest index.
///
/// ## Arguments
/// - **point**: Point with D coordinates
/// - **centroids**: Centroids [row-major], a multiple of D values
pub fn nearest<T: Primitive, D: DistanceFunction<T> + ?Sized>(distance: &D, point: &[T], centroids: &[T]) -> usize {
    let mut best = (0, T::infinity());
    for (idx, c) in centroids.chunks_exact(point.len()).enumerate() {
        let d = distance.distance(point, c);
        if d < best.1 {
            best = (idx, d);
        }
    }
    best.0
}
