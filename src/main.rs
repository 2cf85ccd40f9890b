use anyhow::Context;
use clap::Parser;
use dkmeans::cli::{CliArgs, DataSettings, Mode, RunSettings, StoreSettings};
use dkmeans::telemetry::init_tracing;
use dkmeans::{job, CoordinationStore, MemoryStore, PartitionFileSource, PointSource, SyntheticSource, Worker, WorkerReport};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.debug);
    let settings = RunSettings::try_from(args)?;

    let source: Box<dyn PointSource<f64>> = match &settings.data {
        DataSettings::Synthetic { seed: Some(seed) } => Box::new(SyntheticSource::seeded(*seed)),
        DataSettings::Synthetic { seed: None } => Box::new(SyntheticSource::new()),
        DataSettings::Files { dir } => Box::new(PartitionFileSource::new(dir)),
    };

    match &settings.store {
        StoreSettings::Memory => {
            let store = MemoryStore::new();
            execute(&settings, || Ok(store.clone()), source.as_ref())
        }
        #[cfg(feature = "redis")]
        StoreSettings::Redis(redis) => execute(&settings, || dkmeans::RedisStore::open(redis), source.as_ref()),
    }
}

fn execute<S, C>(settings: &RunSettings, connect: C, source: &dyn PointSource<f64>) -> anyhow::Result<()>
        where S: CoordinationStore + Clone, C: Fn() -> dkmeans::Result<S> {
    let config = &settings.job;
    let started = Instant::now();

    let reports = match settings.mode {
        Mode::InitOnly => {
            job::initialize(&connect()?, config).context("initializing job")?;
            info!(namespace = %config.namespace, "job initialized");
            return Ok(());
        }
        Mode::Worker(worker_id) => {
            let worker = Worker::<f64, S>::new(worker_id, connect()?, config)?;
            vec![worker.run(source)?]
        }
        Mode::Local => {
            job::initialize(&connect()?, config).context("initializing job")?;
            job::run_threads(config, &connect, source)?
        }
    };
    let total = started.elapsed().as_secs_f64();

    let average = reports.iter().map(WorkerReport::iterations_seconds).sum::<f64>() / reports.len() as f64;
    println!("Total k-means time: {:.3} s", total);
    println!("Average iterations time: {:.3} s", average);
    if let Some(first) = reports.first() {
        println!("Iterations: {} (convergence value {})", first.iterations, first.convergence_value);
    }

    if let Some(path) = &settings.output {
        write_csv(path, &reports).with_context(|| format!("writing {}", path.display()))?;
        info!(file = %path.display(), "worker timelines written");
    }
    Ok(())
}

fn write_csv(path: &Path, reports: &[WorkerReport]) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for report in reports {
        writeln!(out, "{}", report.csv_row())?;
    }
    out.flush()
}
