use super::PointSource;
use crate::{Error, Primitive, Result};

/// Serves fixed, in-memory partitions: worker `w` receives `partitions[w]`.
#[derive(Clone, Debug)]
pub struct FixedSource<T: Primitive> {
    partitions: Vec<Vec<T>>,
}
impl<T: Primitive> FixedSource<T> {
    /// ## Arguments
    /// - **partitions**: One row-major point matrix per worker
    pub fn new(partitions: Vec<Vec<T>>) -> Self {
        Self { partitions }
    }
}

impl<T: Primitive> PointSource<T> for FixedSource<T> {
    fn get_points(&self, worker_id: usize, partition_size: usize, dimensions: usize) -> Result<Vec<T>> {
        let partition = self.partitions.get(worker_id)
            .ok_or_else(|| Error::data(worker_id, format!("no partition (only {} available)", self.partitions.len())))?;
        if partition.len() != partition_size * dimensions {
            return Err(Error::data(worker_id, format!(
                "partition holds {} values, expected {} points of {} dimensions",
                partition.len(), partition_size, dimensions)));
        }
        Ok(partition.clone())
    }
}
