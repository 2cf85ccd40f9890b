use super::PointSource;
use crate::{Primitive, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Generates standard-normal points.
///
/// With a seed, worker `w` draws from a generator seeded with `seed + w`, so a run can be
/// reproduced exactly. Without one, every call draws fresh entropy.
#[derive(Clone, Debug, Default)]
pub struct SyntheticSource {
    seed: Option<u64>,
}
impl SyntheticSource {
    pub fn new() -> Self {
        Self { seed: None }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

impl<T: Primitive> PointSource<T> for SyntheticSource {
    fn get_points(&self, worker_id: usize, partition_size: usize, dimensions: usize) -> Result<Vec<T>> {
        let mut rnd = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(worker_id as u64)),
            None => StdRng::from_entropy(),
        };
        Ok((0..partition_size * dimensions)
            .map(|_| T::from(rnd.sample::<f64, _>(StandardNormal)).unwrap_or_else(T::zero))
            .collect())
    }
}
