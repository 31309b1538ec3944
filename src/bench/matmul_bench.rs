//! Criterion benchmarks: serial reference vs tiled vs both parallel strategies.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use parmatmul::{
    Granularity, Matrix, Strategy, multiply_parallel, multiply_serial, multiply_serial_tiled,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;

fn inputs(n: usize) -> (Matrix, Matrix) {
    let mut rng = StdRng::seed_from_u64(42);
    let mut b = Matrix::zeroed(n).unwrap();
    let mut c = Matrix::zeroed(n).unwrap();
    b.fill_random(&mut rng, 0.0..10.0);
    c.fill_random(&mut rng, 0.0..10.0);
    (b, c)
}

fn bench_matmul(crit: &mut Criterion) {
    let mut group = crit.benchmark_group("matmul");
    group.sample_size(10);

    for n in [128, 256, 512] {
        let (b, c) = inputs(n);
        let mut a = Matrix::zeroed(n).unwrap();

        group.bench_with_input(BenchmarkId::new("serial", n), &n, |bench, _| {
            bench.iter(|| multiply_serial(black_box(&mut a), &b, &c).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("tiled", n), &n, |bench, _| {
            bench.iter(|| multiply_serial_tiled(black_box(&mut a), &b, &c).unwrap())
        });

        for strategy in [
            Strategy::Static,
            Strategy::Dynamic(Granularity::Row),
            Strategy::Dynamic(Granularity::Cell),
        ] {
            group.bench_with_input(BenchmarkId::new(strategy.to_string(), n), &n, |bench, _| {
                bench.iter(|| multiply_parallel(black_box(&mut a), &b, &c, 4, strategy).unwrap())
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_matmul);
criterion_main!(benches);
