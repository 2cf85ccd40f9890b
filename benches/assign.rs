use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dkmeans::{LocalState, Metric, PointSource, SyntheticSource};
use std::hint::black_box;

fn bench_assign(c: &mut Criterion) {
    let mut group = c.benchmark_group("assign");
    for &(points, dims, k) in [(20000, 8, 32), (2000, 200, 10), (10000, 100, 25)].iter() {
        let source = SyntheticSource::seeded(1337);
        let samples: Vec<f64> = source.get_points(0, points, dims).unwrap();
        let centroids: Vec<f64> = source.get_points(1, k, dims).unwrap();
        for metric in [Metric::Euclidean, Metric::Cosine] {
            let id = BenchmarkId::new(format!("{:?}", metric), format!("{}x{}/k{}", points, dims, k));
            group.bench_with_input(id, &centroids, |b, centroids| {
                let mut state = LocalState::new(samples.clone(), dims, k);
                b.iter(|| black_box(state.assign(&metric, centroids)));
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_assign);
criterion_main!(benches);
