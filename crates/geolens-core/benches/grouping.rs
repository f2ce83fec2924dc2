//! Benchmarks for the similarity matrix and greedy partition.
//!
//! Run with: cargo bench -p geolens-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geolens_core::grouping::{greedy_partition, SimilarityMatrix};
use geolens_core::math::{l2_normalize, softmax, top_k_indices};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DIM: usize = 512;

/// `n` unit vectors arranged in clusters of `cluster` near-copies.
fn clustered_embeddings(n: usize, cluster: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(n);
    let mut center: Vec<f32> = vec![];
    for i in 0..n {
        if i % cluster == 0 {
            center = (0..DIM).map(|_| rng.gen_range(-1.0..1.0)).collect();
        }
        let noisy: Vec<f32> = center
            .iter()
            .map(|c| c + rng.gen_range(-0.05..0.05))
            .collect();
        rows.push(l2_normalize(&noisy));
    }
    rows
}

fn benchmark_similarity_matrix(c: &mut Criterion) {
    let mut group = c.benchmark_group("similarity_matrix");
    for n in [100, 500, 1000] {
        let rows = clustered_embeddings(n, 4, 7);
        group.bench_with_input(BenchmarkId::from_parameter(n), &rows, |b, rows| {
            b.iter(|| SimilarityMatrix::from_normalized(black_box(rows)))
        });
    }
    group.finish();
}

fn benchmark_greedy_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("greedy_partition");
    for n in [100, 500, 1000] {
        let matrix = SimilarityMatrix::from_normalized(&clustered_embeddings(n, 4, 11));
        group.bench_with_input(BenchmarkId::from_parameter(n), &matrix, |b, matrix| {
            b.iter(|| greedy_partition(black_box(matrix), 0.85))
        });
    }
    group.finish();
}

fn benchmark_rank_candidates(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(3);
    let similarities: Vec<f32> = (0..10_000).map(|_| rng.gen_range(-0.3..0.4)).collect();

    c.bench_function("softmax_top5_10k", |b| {
        b.iter(|| {
            let probabilities = softmax(black_box(&similarities));
            top_k_indices(&probabilities, 5)
        })
    });
}

criterion_group!(
    benches,
    benchmark_similarity_matrix,
    benchmark_greedy_partition,
    benchmark_rank_candidates
);
criterion_main!(benches);
