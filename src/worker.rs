use crate::aggregate::{CentroidAggregator, DeltaAggregator};
use crate::barrier::Barrier;
use crate::convergence::ConvergenceCheck;
use crate::distances::nearest;
use crate::error::{Stage, StageExt};
use crate::memory::{narrow, widen};
use crate::source::PointSource;
use crate::store::CoordinationStore;
use crate::timeline::{Timeline, WorkerReport};
use crate::{DistanceFunction, Error, JobConfig, Primitive, Result};
use rayon::prelude::*;
use std::marker::PhantomData;
use tracing::{debug, error, info, instrument};

/// Name of the barrier workers meet at before the first and after every round.
pub const ROUND_BARRIER: &str = "barrier";

/// Everything a worker keeps between rounds. Never shared with other workers.
///
/// ## Fields
/// - **points**: The worker's partition [row-major], read-only after load
/// - **membership**: Cluster of each point in the previous round; `None` before the first round
/// - **sums**: This round's per-cluster sum of assigned points [row-major], K × D
/// - **counts**: This round's per-cluster amount of assigned points
#[derive(Clone, Debug)]
pub struct LocalState<T: Primitive> {
    pub points: Vec<T>,
    pub membership: Vec<Option<usize>>,
    pub sums: Vec<f64>,
    pub counts: Vec<u64>,
    dimensions: usize,
}
impl<T: Primitive> LocalState<T> {
    pub fn new(points: Vec<T>, dimensions: usize, clusters: usize) -> Self {
        let len = points.len() / dimensions;
        Self {
            points,
            membership: vec![None; len],
            sums: vec![0.0; clusters * dimensions],
            counts: vec![0; clusters],
            dimensions,
        }
    }

    /// Amount of points in the partition.
    pub fn len(&self) -> usize {
        self.membership.len()
    }

    pub fn is_empty(&self) -> bool {
        self.membership.is_empty()
    }

    /// This round's partial sum of cluster **k**.
    pub fn sum(&self, k: usize) -> &[f64] {
        &self.sums[k * self.dimensions..(k + 1) * self.dimensions]
    }

    /// Assign every point to its nearest centroid, then rebuild the per-cluster sums and counts.
    ///
    /// ## Arguments
    /// - **distance**: Distance function of the job
    /// - **centroids**: Centroids of this round [row-major], K × D
    ///
    /// ## Returns
    /// Amount of points whose cluster differs from the previous round, in `[0, len]`.
    pub fn assign<D: DistanceFunction<T> + ?Sized>(&mut self, distance: &D, centroids: &[T]) -> u64 {
        let dims = self.dimensions;
        let work_packet_size = self.len() / rayon::current_num_threads();
        let changed = self.points.par_chunks_exact(dims)
            .with_min_len(work_packet_size.max(1))
            .zip(self.membership.par_iter_mut())
            .map(|(p, membership)| {
                let best = nearest(distance, p, centroids);
                let changed = *membership != Some(best);
                *membership = Some(best);
                changed as u64
            })
            .sum::<u64>();

        self.sums.iter_mut().for_each(|v| *v = 0.0);
        self.counts.iter_mut().for_each(|v| *v = 0);
        for (p, membership) in self.points.chunks_exact(dims).zip(self.membership.iter()) {
            if let Some(k) = *membership {
                self.counts[k] += 1;
                self.sums[k * dims..(k + 1) * dims].iter_mut()
                    .zip(p.iter().cloned())
                    .for_each(|(s, v)| *s += widen(v));
            }
        }
        changed
    }
}


/// One of the P stateless participants of a job.
///
/// A worker owns its store handle (and through it, its barrier and aggregator views). It
/// loads its partition, meets the others at the start barrier and then runs rounds of
/// fetch, assign, publish, barrier and check until the shared convergence value drops to the
/// threshold or `max_iterations` rounds are done. Because every worker reads the same
/// finalized value after the same barrier, all workers of a job stop after the same round.
pub struct Worker<T: Primitive, S: CoordinationStore> {
    worker_id: usize,
    config: JobConfig,
    barrier: Barrier<S>,
    centroids: CentroidAggregator<S>,
    delta: DeltaAggregator<S>,
    _p: PhantomData<T>,
}
impl<T: Primitive, S: CoordinationStore + Clone> Worker<T, S> {
    /// ## Arguments
    /// - **worker_id**: Id of this worker, in `[0, parallelism)`
    /// - **store**: Store handle owned by this worker
    /// - **config**: Configuration of the job
    pub fn new(worker_id: usize, store: S, config: &JobConfig) -> Result<Self> {
        config.validate()?;
        if worker_id >= config.parallelism {
            return Err(Error::config(format!(
                "worker id {} out of range for parallelism {}", worker_id, config.parallelism)));
        }
        let ns = &config.namespace;
        Ok(Self {
            worker_id,
            barrier: Barrier::new(store.clone(), ns, ROUND_BARRIER, config.parallelism),
            centroids: CentroidAggregator::new(store.clone(), ns, config.clusters, config.dimensions, config.parallelism),
            delta: DeltaAggregator::new(store, ns, config.parallelism),
            config: config.clone(),
            _p: PhantomData,
        })
    }
}
impl<T: Primitive, S: CoordinationStore> Worker<T, S> {
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Run the worker to completion.
    ///
    /// Any failure aborts the worker, is tagged with the [`Stage`] it happened in and logged at
    /// `error` level. The other workers of the job are not notified and stay blocked at their
    /// next barrier.
    #[instrument(name = "worker", skip_all, fields(worker_id = self.worker_id))]
    pub fn run(mut self, source: &dyn PointSource<T>) -> Result<WorkerReport> {
        let result = self.run_stages(source);
        if let Err(err) = &result {
            error!(stage = ?err.stage(), error = %err, "worker failed");
        }
        result
    }

    fn run_stages(&mut self, source: &dyn PointSource<T>) -> Result<WorkerReport> {
        let id = self.worker_id;
        let (clusters, dims) = (self.config.clusters, self.config.dimensions);
        let partition_size = self.config.partition_size();
        let mut timeline = Timeline::new();
        timeline.mark();
        info!(parallelism = self.config.parallelism, clusters, max_iterations = self.config.max_iterations,
            "worker started");

        let points = source.get_points(id, partition_size, dims)
            .and_then(|points| match points.len() == partition_size * dims {
                true => Ok(points),
                false => Err(Error::data(id, format!(
                    "source returned {} values, expected {} points of {} dimensions", points.len(), partition_size, dims))),
            })
            .at(id, Stage::Load)?;
        let mut state = LocalState::new(points, dims, clusters);
        if self.config.debug {
            info!(points = state.len(), "partition loaded: {:?}", state.points);
        }

        self.barrier.wait().at(id, Stage::Barrier)?;
        timeline.mark();

        let mut check = ConvergenceCheck::new(self.config.threshold, self.config.max_iterations);
        while check.should_continue() {
            let centroids: Vec<T> = narrow(&self.centroids.snapshot().at(id, Stage::Fetch)?);
            timeline.mark();

            let changed = state.assign(&self.config.metric, &centroids);
            timeline.mark();

            for k in 0..clusters {
                self.centroids.publish(k, state.sum(k), state.counts[k]).at(id, Stage::Publish)?;
            }
            self.delta.publish(changed, state.len() as u64).at(id, Stage::Publish)?;
            timeline.mark();

            let position = self.barrier.wait().at(id, Stage::Barrier)?;
            timeline.mark();

            let value = self.delta.value().at(id, Stage::Check)?;
            check.next(value);
            if self.config.debug {
                info!(iteration = check.iterations(), changed, position, convergence_value = value, "round finished");
            } else {
                debug!(iteration = check.iterations(), changed, position, convergence_value = value, "round finished");
            }
        }

        timeline.mark();
        let report = WorkerReport {
            worker_id: id,
            iterations: check.iterations(),
            convergence_value: check.value(),
            timeline,
        };
        info!(iterations = report.iterations, converged = check.converged(),
            seconds = report.iterations_seconds(), "worker finished");
        Ok(report)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Metric;
    use crate::source::FixedSource;
    use crate::store::MemoryStore;

    #[test]
    fn first_round_changes_every_point() {
        let mut state = LocalState::new(vec![0.0f64, 0.1, 10.0], 1, 2);
        assert_eq!(state.len(), 3);
        assert_eq!(state.assign(&Metric::Euclidean, &[0.0, 10.0]), 3);
        assert_eq!(state.membership, vec![Some(0), Some(0), Some(1)]);
        assert_eq!(state.counts, vec![2, 1]);
        assert_approx_eq!(state.sum(0)[0], 0.1);
        assert_approx_eq!(state.sum(1)[0], 10.0);

        // same centroids again: nothing moves, partials are rebuilt rather than accumulated
        assert_eq!(state.assign(&Metric::Euclidean, &[0.0, 10.0]), 0);
        assert_eq!(state.counts, vec![2, 1]);
        assert_approx_eq!(state.sum(0)[0], 0.1);
    }

    #[test]
    fn changed_count_is_bounded_by_partition() {
        let points: Vec<f32> = (0..200).map(|i| (i % 17) as f32 - 8.0).collect();
        let mut state = LocalState::new(points, 2, 3);
        let rounds = [[-5.0f32, -5.0, 0.0, 0.0, 5.0, 5.0], [5.0, 5.0, -5.0, -5.0, 0.0, 0.0]];
        for centroids in rounds.iter() {
            let changed = state.assign(&Metric::Manhattan, centroids);
            assert!(changed as usize <= state.len());
            assert_eq!(state.counts.iter().sum::<u64>() as usize, state.len());
        }
    }

    #[test]
    fn empty_cluster_publishes_zero_partials() {
        let mut state = LocalState::new(vec![1.0f64, 1.0, 2.0, 2.0], 2, 2);
        state.assign(&Metric::Euclidean, &[0.0, 0.0, 100.0, 100.0]);
        assert_eq!(state.counts, vec![2, 0]);
        assert_eq!(state.sum(0), &[3.0, 3.0]);
        assert_eq!(state.sum(1), &[0.0, 0.0]);
    }

    #[test]
    fn rejects_worker_id_out_of_range() {
        let config = JobConfig::build(2, 1, 1, 4).build().unwrap();
        assert!(Worker::<f64, _>::new(2, MemoryStore::new(), &config).is_err());
        assert!(Worker::<f64, _>::new(1, MemoryStore::new(), &config).is_ok());
    }

    #[test]
    fn single_worker_converges() {
        let store = MemoryStore::new();
        let config = JobConfig::build(1, 2, 1, 4).threshold(0.001).max_iterations(20).namespace("single").build().unwrap();
        CentroidAggregator::new(store.clone(), "single", 2, 1, 1).initialize_with(&[-1.0, 1.0]).unwrap();
        DeltaAggregator::new(store.clone(), "single", 1).initialize().unwrap();

        let source = FixedSource::new(vec![vec![-3.0f64, -2.0, 2.0, 3.0]]);
        let report = Worker::<f64, _>::new(0, store.clone(), &config).unwrap().run(&source).unwrap();
        assert_eq!(report.worker_id, 0);
        assert_eq!(report.iterations, 2);
        assert_eq!(report.convergence_value, 0.0);
        // start, after start barrier, 4 marks per round, end
        assert_eq!(report.timeline.marks().len(), 2 + 4 * 2 + 1);

        let centroids = CentroidAggregator::new(store, "single", 2, 1, 1).snapshot().unwrap();
        assert_approx_eq!(centroids[0], -2.5);
        assert_approx_eq!(centroids[1], 2.5);
    }

    #[test]
    fn zero_max_iterations_only_synchronizes() {
        let store = MemoryStore::new();
        let config = JobConfig::build(1, 1, 1, 2).max_iterations(0).build().unwrap();
        let source = FixedSource::new(vec![vec![1.0f64, 2.0]]);
        let report = Worker::<f64, _>::new(0, store, &config).unwrap().run(&source).unwrap();
        assert_eq!(report.iterations, 0);
        assert_eq!(report.convergence_value, 1.0);
        assert_eq!(report.timeline.marks().len(), 3);
    }

    #[test]
    fn load_failure_names_the_stage() {
        let config = JobConfig::build(1, 1, 2, 2).build().unwrap();
        let source = FixedSource::new(vec![vec![1.0f64, 2.0, 3.0]]);
        let err = Worker::<f64, _>::new(0, MemoryStore::new(), &config).unwrap().run(&source).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Load));
        assert!(err.to_string().contains("during load"), "{}", err);
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<parking_lot::Mutex<Vec<u8>>>);
    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> { Ok(()) }
    }

    #[test]
    fn failure_is_logged_with_its_stage() {
        let config = JobConfig::build(2, 1, 1, 2).build().unwrap();
        // only worker 0 has a partition
        let source = FixedSource::new(vec![vec![1.0f64]]);
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let result = tracing::subscriber::with_default(subscriber, || {
            Worker::<f64, _>::new(1, MemoryStore::new(), &config).unwrap().run(&source)
        });
        assert_eq!(result.unwrap_err().stage(), Some(Stage::Load));

        let log = String::from_utf8(captured.0.lock().clone()).unwrap();
        assert!(log.contains("ERROR"), "{}", log);
        assert!(log.contains("worker failed"), "{}", log);
        assert!(log.contains("worker 1 failed during load"), "{}", log);
        assert!(log.contains("worker_id=1"), "{}", log);
    }

    #[test]
    fn uninitialized_centroids_fail_in_fetch() {
        let config = JobConfig::build(1, 1, 1, 1).build().unwrap();
        let source = FixedSource::new(vec![vec![1.0f64]]);
        let err = Worker::<f64, _>::new(0, MemoryStore::new(), &config).unwrap().run(&source).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Fetch));
    }
}
