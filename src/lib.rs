//! # dkmeans - API documentation
//!
//! dkmeans runs Lloyd-style k-means clustering across P independent workers that share no
//! memory. All cross-worker state lives in an external key-value store (Redis, or an
//! in-process store for local runs), and workers coordinate exclusively through it.
//!
//! ## Design target
//! Workers are stateless between jobs and know nothing of each other except the job's
//! parallelism. Each round, every worker
//! 1. fetches the published centroids,
//! 2. assigns its own points to the nearest centroid and sums them up per cluster,
//! 3. publishes its partial sums and its count of changed assignments,
//! 4. waits at a [`Barrier`] until all P workers published,
//! 5. reads the global convergence value and decides whether to go on.
//!
//! The reductions are done by [`CentroidAggregator`] and [`DeltaAggregator`]. Both run each
//! contribution as one atomic store script and finalize exactly when the Pth contribution of
//! a round arrives, so no worker ever has to act as a leader.
//!
//! ## Fixed parallelism
//! The barrier and both aggregators are keyed to the constant P. A worker that dies leaves the
//! others blocked at their next barrier; there is no timeout and no elastic membership.
//!
//! ## Supported primitive types
//! Points are processed locally as
//! - [`f32`]
//! - [`f64`]
//!
//! Everything stored in the coordination store is `f64`.
//!
//! ## Example
//! ```rust
//! use dkmeans::*;
//!
//! fn main() -> Result<()> {
//!     let config = JobConfig::build(2, 2, 1, 6)
//!         .threshold(0.001)
//!         .max_iterations(20)
//!         .build()?;
//!     let store = MemoryStore::new();
//!     job::initialize_with(&store, &config, &[1.0, 2.0])?;
//!
//!     let source = FixedSource::new(vec![vec![0.0, 0.1, -0.1], vec![10.0, 9.9, 10.1]]);
//!     let reports = job::run_threads::<f64, _, _>(&config, || Ok(store.clone()), &source)?;
//!
//!     println!("{} iterations", reports[0].iterations);
//!     println!("Centroids: {:?}", job::centroids(&store, &config)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Short API-Overview / Description
//! A job is described by a [`JobConfig`]. Before the workers start, a coordinator calls
//! [`job::initialize`] once to seed the shared state. Each [`Worker`] is then constructed with
//! its own store handle and run to completion with a [`PointSource`] that hands it its
//! partition; [`job::run_threads`] does both for all P workers inside one process. Every
//! worker returns a [`WorkerReport`] with its iteration count and a [`Timeline`] of its
//! lifecycle.
//!
//! The store is abstracted by [`CoordinationStore`]. [`MemoryStore`] is always available,
//! `RedisStore` requires the `redis` feature.

#[macro_use] mod helpers;
mod error;
mod memory;
mod config;
mod store;
mod barrier;
mod aggregate;
mod distances;
mod source;
mod convergence;
mod timeline;
mod worker;
pub mod job;
pub mod cli;
pub mod telemetry;

pub use error::{Error, Result, Stage};
pub use memory::Primitive;
pub use config::{JobConfig, JobConfigBuilder, Metric};
pub use store::{Commands, CoordinationStore, MemoryStore, Script};
#[cfg(feature = "redis")]
pub use store::{RedisSettings, RedisStore};
pub use barrier::Barrier;
pub use aggregate::{seeded_centroid, CentroidAggregator, DeltaAggregator, UPDATE_CENTROID, UPDATE_DELTA};
pub use distances::{nearest, CosineDistance, DistanceFunction, EuclideanDistance, ManhattanDistance};
pub use source::{FixedSource, PartitionFileSource, PointSource, SyntheticSource};
pub use convergence::ConvergenceCheck;
pub use timeline::{Timeline, WorkerReport};
pub use worker::{LocalState, Worker, ROUND_BARRIER};
