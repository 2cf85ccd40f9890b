//! Coordinator side of a job: one-time initialization of the shared state and in-process
//! dispatch of the workers.

use crate::aggregate::{CentroidAggregator, DeltaAggregator};
use crate::source::PointSource;
use crate::store::CoordinationStore;
use crate::timeline::WorkerReport;
use crate::worker::Worker;
use crate::{Error, JobConfig, Primitive, Result};
use tracing::{info, instrument};

/// Seed the shared centroids (cluster k from `seed_base + k`) and reset the convergence value.
/// Must run once, before any worker of the job starts, and overwrites previous state in the
/// job's namespace.
#[instrument(skip_all, fields(namespace = %config.namespace))]
pub fn initialize<S: CoordinationStore + Clone>(store: &S, config: &JobConfig) -> Result<()> {
    config.validate()?;
    let (global_centroids, global_delta) = aggregators(store, config);
    global_centroids.initialize(config.seed_base)?;
    global_delta.initialize()
}

/// Like [`initialize`], but publishes the given centroids instead of seeded ones.
///
/// ## Arguments
/// - **centroids**: Initial centroids [row-major] = [<centroid0>,<centroid1>,...], K × D values
#[instrument(skip_all, fields(namespace = %config.namespace))]
pub fn initialize_with<S: CoordinationStore + Clone>(store: &S, config: &JobConfig, centroids: &[f64]) -> Result<()> {
    config.validate()?;
    let (global_centroids, global_delta) = aggregators(store, config);
    global_centroids.initialize_with(centroids)?;
    global_delta.initialize()
}

/// The currently published centroids of a job [row-major], K × D values.
pub fn centroids<S: CoordinationStore + Clone>(store: &S, config: &JobConfig) -> Result<Vec<f64>> {
    aggregators(store, config).0.snapshot()
}

fn aggregators<S: CoordinationStore + Clone>(store: &S, config: &JobConfig) -> (CentroidAggregator<S>, DeltaAggregator<S>) {
    (
        CentroidAggregator::new(store.clone(), &config.namespace, config.clusters, config.dimensions, config.parallelism),
        DeltaAggregator::new(store.clone(), &config.namespace, config.parallelism),
    )
}

/// Run all P workers of an initialized job on threads of this process and wait for them.
///
/// Every worker gets its own store handle from **connect**. All handles are opened and all
/// workers constructed before the first thread starts, so connection and configuration
/// failures surface without leaving anybody blocked. A worker failing after that point stalls
/// the others at their next barrier, and this call does not return.
///
/// ## Arguments
/// - **config**: Configuration of the job
/// - **connect**: Opens a new store handle
/// - **source**: Point source all workers load their partitions from
///
/// ## Returns
/// The reports of all workers, ordered by worker id.
pub fn run_threads<T, S, C>(config: &JobConfig, connect: C, source: &dyn PointSource<T>) -> Result<Vec<WorkerReport>>
        where T: Primitive, S: CoordinationStore + Clone, C: Fn() -> Result<S> {
    config.validate()?;
    let workers = (0..config.parallelism)
        .map(|worker_id| Worker::<T, S>::new(worker_id, connect()?, config))
        .collect::<Result<Vec<_>>>()?;
    info!(parallelism = config.parallelism, clusters = config.clusters, dimensions = config.dimensions,
        partition_size = config.partition_size(), "dispatching workers");

    std::thread::scope(|s| {
        let handles: Vec<_> = workers.into_iter()
            .map(|worker| (worker.worker_id(), s.spawn(move || worker.run(source))))
            .collect();
        handles.into_iter()
            .map(|(worker_id, handle)| handle.join().unwrap_or(Err(Error::WorkerPanicked { worker_id })))
            .collect()
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FixedSource, SyntheticSource};
    use crate::store::MemoryStore;

    #[test]
    fn initialization_is_deterministic() {
        let config = JobConfig::build(2, 3, 4, 10).build().unwrap();
        let (a, b) = (MemoryStore::new(), MemoryStore::new());
        initialize(&a, &config).unwrap();
        initialize(&b, &config).unwrap();
        let snapshot = centroids(&a, &config).unwrap();
        assert_eq!(snapshot.len(), 12);
        assert_eq!(snapshot, centroids(&b, &config).unwrap());
        assert_eq!(DeltaAggregator::new(a, "kmeans", 2).value().unwrap(), 1.0);
    }

    #[test]
    fn invalid_configuration_leaves_store_untouched() {
        let mut config = JobConfig::build(2, 3, 4, 10).build().unwrap();
        config.clusters = 0;
        let store = MemoryStore::new();
        assert!(matches!(initialize(&store, &config), Err(Error::Configuration { .. })));
        assert!(store.keys().is_empty());
    }

    #[test]
    fn connection_failure_surfaces_before_dispatch() {
        let config = JobConfig::build(2, 1, 1, 2).build().unwrap();
        let source = FixedSource::new(vec![vec![0.0f64], vec![1.0]]);
        let result = run_threads::<f64, _, _>(&config, || -> Result<MemoryStore> {
            Err(Error::store("CONNECT", "", "refused"))
        }, &source);
        assert!(matches!(result, Err(Error::Store { op: "CONNECT", .. })));
    }

    #[test]
    fn workers_agree_on_iteration_count() {
        let store = MemoryStore::new();
        let config = JobConfig::build(4, 3, 2, 400).max_iterations(8).namespace("agree").build().unwrap();
        initialize(&store, &config).unwrap();
        let reports = run_threads::<f64, _, _>(&config, || Ok(store.clone()), &SyntheticSource::seeded(5)).unwrap();
        assert_eq!(reports.iter().map(|r| r.worker_id).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        let iterations = reports[0].iterations;
        assert!(iterations >= 1 && iterations <= 8);
        for r in reports.iter() {
            assert_eq!(r.iterations, iterations);
            assert_eq!(r.convergence_value, reports[0].convergence_value);
            assert!((0.0..=1.0).contains(&r.convergence_value));
        }
    }
}
