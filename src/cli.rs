use crate::config::{JobConfig, Metric, DEFAULT_MAX_ITERATIONS, DEFAULT_NAMESPACE, DEFAULT_SEED_BASE, DEFAULT_THRESHOLD};
#[cfg(feature = "redis")]
use crate::store::RedisSettings;
use crate::{Error, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Command line of the `dkmeans` binary.
///
/// Every option can also be given through the environment variable named next to it.
#[derive(Parser, Debug, Clone)]
#[command(name = "dkmeans", version, about = "Distributed k-means over workers coordinating through a key-value store")]
pub struct CliArgs {
    /// Number of workers (P).
    ///
    /// Environment variable: `KMEANS_PARALLELISM`
    #[arg(short, long, env = "KMEANS_PARALLELISM", default_value_t = 2)]
    pub parallelism: usize,

    /// Number of clusters (K).
    ///
    /// Environment variable: `KMEANS_CLUSTERS`
    #[arg(short = 'k', long, env = "KMEANS_CLUSTERS", default_value_t = 25)]
    pub clusters: usize,

    /// Dimensionality of each point (D).
    ///
    /// Environment variable: `KMEANS_DIMENSIONS`
    #[arg(short, long, env = "KMEANS_DIMENSIONS", default_value_t = 100)]
    pub dimensions: usize,

    /// Size of the whole dataset. Each worker loads `points / parallelism` of them.
    ///
    /// Environment variable: `KMEANS_POINTS`
    #[arg(short = 'n', long, env = "KMEANS_POINTS", default_value_t = 100_000)]
    pub points: usize,

    /// Upper bound for the amount of rounds.
    ///
    /// Environment variable: `KMEANS_MAX_ITERATIONS`
    #[arg(long, env = "KMEANS_MAX_ITERATIONS", default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,

    /// Workers stop once the fraction of points that changed cluster drops to this value.
    ///
    /// Environment variable: `KMEANS_THRESHOLD`
    #[arg(long, env = "KMEANS_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Distance metric of the assignment step.
    ///
    /// Environment variable: `KMEANS_METRIC`
    #[arg(long, env = "KMEANS_METRIC", value_enum, default_value_t = Metric::Euclidean)]
    pub metric: Metric,

    /// Seed of the initial centroids; cluster k is drawn from `seed_base + k`.
    ///
    /// Environment variable: `KMEANS_SEED_BASE`
    #[arg(long, env = "KMEANS_SEED_BASE", default_value_t = DEFAULT_SEED_BASE)]
    pub seed_base: u64,

    /// Prefix of all store keys of the job.
    ///
    /// Environment variable: `KMEANS_NAMESPACE`
    #[arg(long, env = "KMEANS_NAMESPACE", default_value_t = String::from(DEFAULT_NAMESPACE))]
    pub namespace: String,

    /// Log partitions and every round at `info` level.
    #[arg(long, env = "KMEANS_DEBUG", default_value_t = false)]
    pub debug: bool,

    /// Coordination store backend.
    ///
    /// Environment variable: `KMEANS_STORE`
    #[arg(long, env = "KMEANS_STORE", value_enum, default_value_t = Backend::Memory)]
    pub store: Backend,

    /// Environment variable: `REDIS_HOST`
    #[arg(long, env = "REDIS_HOST", default_value_t = String::from("localhost"))]
    pub redis_host: String,

    /// Environment variable: `REDIS_PORT`
    #[arg(long, env = "REDIS_PORT", default_value_t = 6379)]
    pub redis_port: u16,

    /// Environment variable: `REDIS_PASSWORD`
    #[arg(long, env = "REDIS_PASSWORD")]
    pub redis_password: Option<String>,

    /// Directory holding one `part-NNNNN` file of comma-separated points per worker.
    /// Without it, workers generate standard-normal points.
    ///
    /// Environment variable: `KMEANS_DATA_DIR`
    #[arg(long, env = "KMEANS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Seed of the generated points (worker w uses `data_seed + w`). Random if unset.
    #[arg(long, env = "KMEANS_DATA_SEED")]
    pub data_seed: Option<u64>,

    /// Only initialize the shared state of the job, then exit. Requires the redis backend.
    #[arg(long, default_value_t = false, conflicts_with = "worker_id")]
    pub init_only: bool,

    /// Run only this worker of an already initialized job. Requires the redis backend.
    #[arg(long, env = "KMEANS_WORKER_ID")]
    pub worker_id: Option<usize>,

    /// Write one CSV row per worker (id, iterations, convergence value, timestamps) to this file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// In-process store; all workers run as threads of this process
    Memory,
    /// Redis server
    Redis,
}

/// Which store the binary talks to.
#[derive(Clone, Debug)]
pub enum StoreSettings {
    Memory,
    #[cfg(feature = "redis")]
    Redis(RedisSettings),
}

/// Where the workers' points come from.
#[derive(Clone, Debug, PartialEq)]
pub enum DataSettings {
    Synthetic { seed: Option<u64> },
    Files { dir: PathBuf },
}

/// What the binary does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Initialize the job and run all workers on local threads
    Local,
    /// Initialize the job and exit
    InitOnly,
    /// Run one worker of an initialized job
    Worker(usize),
}

/// Validated settings of one invocation.
#[derive(Clone, Debug)]
pub struct RunSettings {
    pub job: JobConfig,
    pub store: StoreSettings,
    pub data: DataSettings,
    pub mode: Mode,
    pub output: Option<PathBuf>,
}

impl TryFrom<CliArgs> for RunSettings {
    type Error = Error;

    fn try_from(args: CliArgs) -> Result<Self> {
        let job = JobConfig::build(args.parallelism, args.clusters, args.dimensions, args.points)
            .max_iterations(args.max_iterations)
            .threshold(args.threshold)
            .metric(args.metric)
            .seed_base(args.seed_base)
            .namespace(args.namespace)
            .debug(args.debug)
            .build()?;

        let mode = match (args.init_only, args.worker_id) {
            (true, _) => Mode::InitOnly,
            (false, Some(id)) if id >= job.parallelism => {
                return Err(Error::config(format!("worker id {} out of range for parallelism {}", id, job.parallelism)));
            }
            (false, Some(id)) => Mode::Worker(id),
            (false, None) => Mode::Local,
        };

        let store = match args.store {
            Backend::Memory if mode != Mode::Local => {
                return Err(Error::config("--init-only and --worker-id need a store shared between processes (--store redis)"));
            }
            Backend::Memory => StoreSettings::Memory,
            #[cfg(feature = "redis")]
            Backend::Redis => StoreSettings::Redis(RedisSettings {
                host: args.redis_host,
                port: args.redis_port,
                password: args.redis_password,
            }),
            #[cfg(not(feature = "redis"))]
            Backend::Redis => return Err(Error::config("this binary was built without the `redis` feature")),
        };

        let data = match args.data_dir {
            Some(dir) => DataSettings::Files { dir },
            None => DataSettings::Synthetic { seed: args.data_seed },
        };

        Ok(Self { job, store, data, mode, output: args.output })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<RunSettings> {
        let args = CliArgs::try_parse_from(std::iter::once("dkmeans").chain(args.iter().cloned())).unwrap();
        RunSettings::try_from(args)
    }

    #[test]
    fn defaults_run_locally() {
        let settings = parse(&[]).unwrap();
        assert_eq!(settings.mode, Mode::Local);
        assert!(matches!(settings.store, StoreSettings::Memory));
        assert_eq!(settings.data, DataSettings::Synthetic { seed: None });
        assert_eq!(settings.job.parallelism, 2);
        assert_eq!(settings.job.clusters, 25);
        assert_eq!(settings.job.threshold, DEFAULT_THRESHOLD);
        assert_eq!(settings.job.seed_base, 1002);
    }

    #[test]
    fn job_options() {
        let settings = parse(&["-p", "4", "-k", "3", "-d", "2", "-n", "40", "--metric", "cosine",
            "--threshold", "0.01", "--data-dir", "/data", "--namespace", "run1"]).unwrap();
        assert_eq!(settings.job.partition_size(), 10);
        assert_eq!(settings.job.metric, Metric::Cosine);
        assert_eq!(settings.job.namespace, "run1");
        assert_eq!(settings.data, DataSettings::Files { dir: PathBuf::from("/data") });
    }

    #[test]
    fn invalid_job_is_a_configuration_error() {
        assert!(matches!(parse(&["-p", "0"]), Err(Error::Configuration { .. })));
        assert!(matches!(parse(&["--threshold", "1.5"]), Err(Error::Configuration { .. })));
    }

    #[test]
    fn single_worker_mode_needs_shared_store() {
        assert!(parse(&["--worker-id", "1"]).is_err());
        assert!(parse(&["--init-only"]).is_err());
    }

    #[cfg(feature = "redis")]
    #[test]
    fn redis_worker_mode() {
        let settings = parse(&["--store", "redis", "--redis-host", "cache", "--worker-id", "1"]).unwrap();
        assert_eq!(settings.mode, Mode::Worker(1));
        match settings.store {
            StoreSettings::Redis(redis) => assert_eq!(redis.url(), "redis://cache:6379/"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(parse(&["--store", "redis", "--worker-id", "2"]).is_err());
    }
}
