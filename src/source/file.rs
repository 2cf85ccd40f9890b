use super::PointSource;
use crate::{Error, Primitive, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Reads worker partitions from a directory of comma-separated text files.
///
/// Worker `w` reads `<dir>/part-<w>` with the id zero-padded to five digits (`part-00003`).
/// Each non-empty line holds one point. Any unreadable file, unparsable value, line with the
/// wrong number of coordinates, or file with the wrong number of lines is an error.
#[derive(Clone, Debug)]
pub struct PartitionFileSource {
    dir: PathBuf,
}
impl PartitionFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the partition file of **worker_id**.
    pub fn partition_path(&self, worker_id: usize) -> PathBuf {
        self.dir.join(format!("part-{:05}", worker_id))
    }
}

impl<T: Primitive> PointSource<T> for PartitionFileSource {
    fn get_points(&self, worker_id: usize, partition_size: usize, dimensions: usize) -> Result<Vec<T>> {
        let path = self.partition_path(worker_id);
        let file = File::open(&path)
            .map_err(|e| Error::data(worker_id, format!("cannot open {}: {}", path.display(), e)))?;
        let points = read_points(BufReader::new(file), worker_id, &path, partition_size, dimensions)?;
        info!(worker_id, file = %path.display(), points = partition_size, "partition loaded");
        Ok(points)
    }
}

fn read_points<T: Primitive, R: BufRead>(reader: R, worker_id: usize, path: &Path, partition_size: usize, dimensions: usize)
        -> Result<Vec<T>> {
    let mut points = Vec::with_capacity(partition_size * dimensions);
    let mut rows = 0;
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::data(worker_id, format!("{}: {}", path.display(), e)))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if rows == partition_size {
            return Err(Error::data(worker_id, format!(
                "{} holds more than the expected {} points", path.display(), partition_size)));
        }
        let before = points.len();
        for field in line.split(',') {
            let v = field.trim().parse::<T>().map_err(|_| Error::data(worker_id, format!(
                "{}:{}: `{}` is not a number", path.display(), lineno + 1, field.trim())))?;
            points.push(v);
        }
        if points.len() - before != dimensions {
            return Err(Error::data(worker_id, format!(
                "{}:{}: point has {} dimensions, expected {}",
                path.display(), lineno + 1, points.len() - before, dimensions)));
        }
        rows += 1;
    }
    if rows != partition_size {
        return Err(Error::data(worker_id, format!(
            "{} holds {} points, expected {}", path.display(), rows, partition_size)));
    }
    debug!(worker_id, rows, "parsed partition");
    Ok(points)
}
