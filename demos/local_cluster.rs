use dkmeans::*;

fn main() -> Result<()> {
    let (parallelism, k, dims, points) = (4, 5, 8, 40000);
    telemetry::init_tracing(false);

    // Four workers on local threads, sharing an in-process store
    let config = JobConfig::build(parallelism, k, dims, points)
        .max_iterations(50)
        .threshold(0.0005)
        .namespace("demo")
        .build()?;
    let store = MemoryStore::new();
    job::initialize(&store, &config)?;

    let reports = job::run_threads::<f32, _, _>(&config, || Ok(store.clone()), &SyntheticSource::seeded(7))?;

    for r in reports.iter() {
        println!("Worker {}: {} iterations in {:.3} s", r.worker_id, r.iterations, r.iterations_seconds());
    }
    println!("Convergence value: {}", reports[0].convergence_value);
    for (idx, c) in job::centroids(&store, &config)?.chunks_exact(dims).enumerate() {
        println!("Centroid {}: {:?}", idx, c);
    }
    Ok(())
}
