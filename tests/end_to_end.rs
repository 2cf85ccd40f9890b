use dkmeans::*;

fn two_blobs() -> (JobConfig, FixedSource<f64>) {
    let config = JobConfig::build(2, 2, 1, 6)
        .threshold(0.001)
        .max_iterations(20)
        .namespace("e2e")
        .build()
        .unwrap();
    let source = FixedSource::new(vec![vec![0.0, 0.1, -0.1], vec![10.0, 9.9, 10.1]]);
    (config, source)
}

#[test]
fn two_workers_find_both_blobs() {
    let (config, source) = two_blobs();
    let store = MemoryStore::new();
    job::initialize_with(&store, &config, &[1.0, 2.0]).unwrap();

    let reports = job::run_threads::<f64, _, _>(&config, || Ok(store.clone()), &source).unwrap();
    assert_eq!(reports.len(), 2);
    for r in reports.iter() {
        assert_eq!(r.iterations, reports[0].iterations);
        assert!(r.iterations < config.max_iterations);
        assert!(r.convergence_value <= config.threshold);
    }
    // first round moves every point, second round moves none
    assert_eq!(reports[0].iterations, 2);

    let centroids = job::centroids(&store, &config).unwrap();
    assert!(centroids[0].abs() < 1e-9, "{:?}", centroids);
    assert!((centroids[1] - 10.0).abs() < 1e-9, "{:?}", centroids);
}

#[test]
fn seeded_initialization_converges_too() {
    let (config, source) = two_blobs();
    let store = MemoryStore::new();
    job::initialize(&store, &config).unwrap();

    let reports = job::run_threads::<f64, _, _>(&config, || Ok(store.clone()), &source).unwrap();
    assert!(reports.iter().all(|r| r.iterations == reports[0].iterations));
    assert!(reports[0].iterations < config.max_iterations);
    assert!(reports[0].convergence_value <= config.threshold);
}

#[test]
fn store_is_back_at_rest_after_the_job() {
    let (config, source) = two_blobs();
    let store = MemoryStore::new();
    job::initialize_with(&store, &config, &[1.0, 2.0]).unwrap();
    let reports = job::run_threads::<f64, _, _>(&config, || Ok(store.clone()), &source).unwrap();

    for key in ["e2e:centroid0_c", "e2e:centroid1_c", "e2e:delta_c", "e2e:delta_temp", "e2e:delta_st"] {
        assert_eq!(store.get(key).unwrap().as_deref(), Some("0"), "{}", key);
    }
    // only the completion list of the last barrier generation is left behind
    let last = reports[0].iterations;
    let barrier_keys: Vec<String> = store.keys().into_iter().filter(|k| k.contains("barrier")).collect();
    assert_eq!(barrier_keys, vec![format!("e2e:barrier-complete-{}", last)]);
}

#[test]
fn jobs_in_different_namespaces_share_a_store() {
    let store = MemoryStore::new();
    let (config, source) = two_blobs();
    let mut other = config.clone();
    other.namespace = "other".to_owned();
    job::initialize_with(&store, &config, &[1.0, 2.0]).unwrap();
    job::initialize_with(&store, &other, &[-5.0, 20.0]).unwrap();

    std::thread::scope(|s| {
        let a = s.spawn(|| job::run_threads::<f64, _, _>(&config, || Ok(store.clone()), &source).unwrap());
        let b = s.spawn(|| job::run_threads::<f64, _, _>(&other, || Ok(store.clone()), &source).unwrap());
        a.join().unwrap();
        b.join().unwrap();
    });
    let expected = [0.0, 10.0];
    for conf in [&config, &other] {
        let centroids = job::centroids(&store, conf).unwrap();
        for (c, e) in centroids.iter().zip(expected.iter()) {
            assert!((c - e).abs() < 1e-9, "{}: {:?}", conf.namespace, centroids);
        }
    }
}
