//! Where a worker's points come from.
//!
//! A [`PointSource`] hands each worker its fixed partition as a row-major
//! `partition_size × dimensions` matrix. Sources must fail rather than return a partition
//! of the wrong shape.

mod file;
mod fixed;
mod synthetic;

pub use file::PartitionFileSource;
pub use fixed::FixedSource;
pub use synthetic::SyntheticSource;

use crate::{Primitive, Result};

pub trait PointSource<T: Primitive>: Send + Sync {
    /// Load the partition of **worker_id**.
    ///
    /// ## Returns
    /// Points [row-major] = [<point0>,<point1>,...], exactly `partition_size * dimensions` values.
    fn get_points(&self, worker_id: usize, partition_size: usize, dimensions: usize) -> Result<Vec<T>>;
}
