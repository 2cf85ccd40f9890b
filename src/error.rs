//! Error types shared by every component of the crate.
//!
//! There is a single [`Error`] enum. Configuration problems surface before any
//! coordination state is touched, store and data-source failures are fatal to
//! the worker that hits them, and [`Error::Stage`] wraps either of the latter
//! with the lifecycle stage that failed.
//!
//! Nothing in this crate retries. Because the barrier and the aggregators are
//! keyed to a fixed number of participants, one worker failing leaves the
//! remaining workers blocked at their next rendezvous.

use std::fmt;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid job parameters (parallelism, cluster count, dimensionality, threshold, ...).
    #[error("invalid configuration: {reason}")]
    Configuration { reason: String },

    /// A store command or atomic script failed.
    #[error("coordination store `{op}` on `{key}` failed: {reason}")]
    Store {
        op: &'static str,
        key: String,
        reason: String,
    },

    /// Connection or protocol failure reported by the Redis client.
    #[cfg(feature = "redis")]
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    /// A worker's partition could not be loaded, or was malformed.
    #[error("data source for worker {worker_id}: {reason}")]
    DataSource { worker_id: usize, reason: String },

    /// Any of the above, tagged with the lifecycle stage it interrupted.
    #[error("worker {worker_id} failed during {stage}: {source}")]
    Stage {
        worker_id: usize,
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    /// A dispatched worker thread panicked instead of returning.
    #[error("worker {worker_id} panicked")]
    WorkerPanicked { worker_id: usize },
}

impl Error {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Error::Configuration { reason: reason.into() }
    }

    pub(crate) fn store(op: &'static str, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Store { op, key: key.into(), reason: reason.into() }
    }

    pub(crate) fn data(worker_id: usize, reason: impl Into<String>) -> Self {
        Error::DataSource { worker_id, reason: reason.into() }
    }

    /// The stage a worker was in when this error occurred, if it was tagged with one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Lifecycle stage of a worker, used to report where a failure happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Load,
    Barrier,
    Fetch,
    Publish,
    Check,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Load => "load",
            Stage::Barrier => "barrier",
            Stage::Fetch => "fetch",
            Stage::Publish => "publish",
            Stage::Check => "check",
        })
    }
}

/// Tags the error of a fallible worker step with its [`Stage`].
pub(crate) trait StageExt<T> {
    fn at(self, worker_id: usize, stage: Stage) -> Result<T>;
}

impl<T> StageExt<T> for Result<T> {
    fn at(self, worker_id: usize, stage: Stage) -> Result<T> {
        self.map_err(|source| Error::Stage { worker_id, stage, source: Box::new(source) })
    }
}
