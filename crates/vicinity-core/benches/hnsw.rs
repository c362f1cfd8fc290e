//! HNSW build and search benchmarks.
//!
//! Covers graph construction, single and batch k-NN queries, and a
//! side-by-side comparison of the prefetch modes on the same built index.
//!
//! # Run with
//!
//! ```bash
//! cargo bench --bench hnsw
//! cargo bench --bench hnsw -- prefetch
//! ```

#![allow(clippy::cast_precision_loss)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use vicinity_core::{Dataset, DistanceMetric, HnswIndex, HnswParams, PrefetchMode, SearchParams};

const DIMENSIONS: &[usize] = &[32, 128, 768];
const COLLECTION_SIZE: usize = 2_000;
const K: usize = 10;

fn random_dataset(n: usize, dim: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<f32> = (0..n * dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
    Dataset::dense((0..n as u64).collect(), dim, data).expect("valid dense dataset")
}

fn build_index(dim: usize) -> HnswIndex {
    let params = HnswParams::new(DistanceMetric::Euclidean, dim, 16, 200);
    let index = HnswIndex::new(params).expect("valid params");
    index
        .build(&random_dataset(COLLECTION_SIZE, dim, 42))
        .expect("build succeeds");
    index
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_build");
    group.sample_size(10);
    for &dim in &[32, 128] {
        let dataset = random_dataset(500, dim, 7);
        group.throughput(Throughput::Elements(500));
        group.bench_with_input(BenchmarkId::from_parameter(dim), &dataset, |b, dataset| {
            b.iter(|| {
                let params = HnswParams::new(DistanceMetric::Euclidean, dim, 16, 200);
                let index = HnswIndex::new(params).expect("valid params");
                index.build(dataset).expect("build succeeds");
                black_box(index.len())
            });
        });
    }
    group.finish();
}

fn bench_knn_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_knn_search");
    for &dim in DIMENSIONS {
        let index = build_index(dim);
        let query: Vec<f32> = (0..dim).map(|i| (i as f32 * 0.01).sin()).collect();
        let search = SearchParams::new(100);
        group.bench_with_input(BenchmarkId::from_parameter(dim), &index, |b, index| {
            b.iter(|| black_box(index.knn_search(&query, K, &search).expect("search succeeds")));
        });
    }
    group.finish();
}

fn bench_prefetch_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_prefetch");
    let dim = 768;
    let index = build_index(dim);
    let query: Vec<f32> = (0..dim).map(|i| (i as f32 * 0.01).cos()).collect();

    let modes = [
        ("disabled", PrefetchMode::Disabled),
        ("hardcoded", PrefetchMode::Hardcoded),
        (
            "custom",
            PrefetchMode::Custom {
                stride_codes: 4,
                depth_codes: 2,
                stride_visit: 3,
            },
        ),
    ];
    for (name, mode) in modes {
        let search = SearchParams::new(100).with_prefetch(mode);
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            b.iter(|| black_box(index.knn_search(&query, K, &search).expect("search succeeds")));
        });
    }
    group.finish();
}

fn bench_batch_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_batch_search");
    let dim = 128;
    let index = build_index(dim);
    let queries = random_dataset(64, dim, 99);
    let search = SearchParams::new(100);
    group.throughput(Throughput::Elements(64));
    group.bench_function("batch_64", |b| {
        b.iter(|| {
            black_box(
                index
                    .knn_search_batch(&queries, K, &search)
                    .expect("batch search succeeds"),
            )
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_build,
    bench_knn_search,
    bench_prefetch_modes,
    bench_batch_search
);
criterion_main!(benches);
