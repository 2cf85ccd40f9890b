use crate::{Error, Result};

/// Threshold on the global convergence value below which workers stop iterating.
pub const DEFAULT_THRESHOLD: f64 = 0.00001;
/// Base seed for the deterministic centroid initialization (cluster k uses `seed_base + k`).
pub const DEFAULT_SEED_BASE: u64 = 1002;
pub const DEFAULT_MAX_ITERATIONS: usize = 10;
pub const DEFAULT_NAMESPACE: &str = "kmeans";

/// Distance metric used by the assignment step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Metric {
    /// Squared euclidean distance
    #[default]
    Euclidean,
    Manhattan,
    /// `1 - cosine similarity`
    Cosine,
}

/// Parameters of one distributed k-means job. Every worker of a job, and the coordinator step
/// that initializes the shared state, must be given the same configuration.
///
/// Use [`JobConfig::build`] to create one; the builder validates all values.
///
/// ## Fields
/// - **parallelism**: Number of workers (P). Fixed for the job's lifetime, the barrier and the
///   aggregators finalize exactly when P contributions arrived.
/// - **clusters**: Number of clusters (K)
/// - **dimensions**: Dimensionality of each point (D)
/// - **total_points**: Size of the whole dataset, each worker loads `total_points / parallelism`
/// - **max_iterations**: Upper bound for the number of rounds
/// - **threshold**: Workers stop once the global convergence value is `<= threshold`
/// - **metric**: Distance metric of the assignment step
/// - **seed_base**: Seed of the deterministic centroid initialization
/// - **namespace**: Prefix of all store keys of this job
/// - **debug**: Log every round at `info` level instead of `debug`
#[derive(Clone, Debug, PartialEq)]
pub struct JobConfig {
    pub parallelism: usize,
    pub clusters: usize,
    pub dimensions: usize,
    pub total_points: usize,
    pub max_iterations: usize,
    pub threshold: f64,
    pub metric: Metric,
    pub seed_base: u64,
    pub namespace: String,
    pub debug: bool,
}
impl JobConfig {
    /// Use the [`JobConfigBuilder`] to build a [`JobConfig`] instance.
    ///
    /// ## Arguments
    /// - **parallelism**: Number of workers
    /// - **clusters**: Number of clusters
    /// - **dimensions**: Dimensionality of the points
    /// - **total_points**: Size of the whole dataset
    pub fn build(parallelism: usize, clusters: usize, dimensions: usize, total_points: usize) -> JobConfigBuilder {
        JobConfigBuilder {
            config: JobConfig {
                parallelism,
                clusters,
                dimensions,
                total_points,
                max_iterations: DEFAULT_MAX_ITERATIONS,
                threshold: DEFAULT_THRESHOLD,
                metric: Metric::default(),
                seed_base: DEFAULT_SEED_BASE,
                namespace: DEFAULT_NAMESPACE.to_owned(),
                debug: false,
            },
        }
    }

    /// Amount of points each worker loads.
    pub fn partition_size(&self) -> usize {
        self.total_points / self.parallelism
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.parallelism == 0 {
            return Err(Error::config("parallelism must be greater than 0"));
        }
        if self.clusters == 0 {
            return Err(Error::config("cluster count must be greater than 0"));
        }
        if self.dimensions == 0 {
            return Err(Error::config("dimensionality must be greater than 0"));
        }
        if self.partition_size() == 0 {
            return Err(Error::config(format!(
                "{} points cannot be split across {} workers", self.total_points, self.parallelism)));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 || self.threshold >= 1.0 {
            return Err(Error::config(format!("threshold {} must lie in [0, 1)", self.threshold)));
        }
        if self.namespace.is_empty() {
            return Err(Error::config("namespace must not be empty"));
        }
        Ok(())
    }
}

pub struct JobConfigBuilder {
    config: JobConfig,
}
impl JobConfigBuilder {
    /// Set the maximum amount of rounds.
    /// ## Default
    /// `10`
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations; self
    }
    /// Set the convergence threshold. Must lie in `[0, 1)`.
    /// ## Default
    /// `0.00001`
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.config.threshold = threshold; self
    }
    pub fn metric(mut self, metric: Metric) -> Self {
        self.config.metric = metric; self
    }
    /// Set the base seed of the centroid initialization.
    /// ## Default
    /// `1002`
    pub fn seed_base(mut self, seed_base: u64) -> Self {
        self.config.seed_base = seed_base; self
    }
    /// Set the prefix of all store keys.
    /// ## Default
    /// `"kmeans"`
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into(); self
    }
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug; self
    }
    /// Validate and return the configuration.
    pub fn build(self) -> Result<JobConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
