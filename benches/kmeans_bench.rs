//! Performance benchmarks for k-means training and the automatic k sweep

use criterion::{Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use segmenta::clustering::KMeansParams;
use segmenta::clustering::kmeans::kmeans;
use segmenta::clustering::selection::{SweepParams, select_k};
use std::hint::black_box;
use tokio_util::sync::CancellationToken;

fn create_blobs(per_blob: usize, centers: &[[f64; 4]]) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(42);
    centers
        .iter()
        .flat_map(|center| {
            (0..per_blob)
                .map(|_| center.iter().map(|c| c + rng.random_range(-0.5..0.5)).collect())
                .collect::<Vec<Vec<f64>>>()
        })
        .collect()
}

fn params(k: usize) -> KMeansParams {
    KMeansParams {
        k,
        n_init: 10,
        max_iterations: 300,
        tolerance: 1e-4,
        seed: 42,
    }
}

fn bench_kmeans(c: &mut Criterion) {
    let centers = [
        [0.0, 0.0, 0.0, 0.0],
        [5.0, 5.0, 0.0, 0.0],
        [0.0, 5.0, 5.0, 5.0],
        [5.0, 0.0, 5.0, 0.0],
    ];
    let vectors = create_blobs(250, &centers);

    c.bench_function("kmeans_1000x4_k4", |b| {
        b.iter(|| kmeans(black_box(&vectors), &params(4)))
    });
}

fn bench_sweep(c: &mut Criterion) {
    let centers = [[0.0, 0.0, 0.0, 0.0], [6.0, 6.0, 0.0, 0.0], [0.0, 6.0, 6.0, 6.0]];
    let vectors = create_blobs(100, &centers);
    let cancel = CancellationToken::new();

    let mut group = c.benchmark_group("k_sweep_300x4");
    for parallel in [false, true] {
        let sweep = SweepParams {
            k_min: 2,
            k_max: 8,
            base: params(2),
            parallel,
            silhouette_sample_size: 5000,
            sample_seed: 42,
        };
        let name = if parallel { "parallel" } else { "sequential" };
        group.bench_function(name, |b| {
            b.iter(|| select_k(black_box(&vectors), &sweep, &cancel))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_kmeans, bench_sweep);
criterion_main!(benches);
