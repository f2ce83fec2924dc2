//! End-to-end grouping behavior against a stub embedder.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use geolens_core::{EmbeddingError, GroupingError, ImageEmbedder, SimilarityGrouper};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

/// Serves preset vectors; paths without one are unreadable.
#[derive(Default)]
struct StubEmbedder {
    vectors: HashMap<PathBuf, Vec<f32>>,
    calls: usize,
}

impl StubEmbedder {
    fn with(vectors: Vec<(PathBuf, Vec<f32>)>) -> Self {
        Self {
            vectors: vectors.into_iter().collect(),
            calls: 0,
        }
    }
}

impl ImageEmbedder for StubEmbedder {
    fn embed_image(&mut self, path: &Path) -> Result<Vec<f32>, EmbeddingError> {
        self.calls += 1;
        self.vectors
            .get(path)
            .cloned()
            .ok_or_else(|| EmbeddingError::UnreadableImage {
                path: path.to_path_buf(),
                message: "cannot identify image file".to_string(),
            })
    }

    fn clear_cache(&mut self) {}
}

fn image(i: usize) -> PathBuf {
    PathBuf::from(format!("img_{i:03}.jpg"))
}

/// Unit vector with cosine `rho` to every other vector sharing `axis`:
/// `sqrt(rho) * e_axis + sqrt(1 - rho) * e_private`.
fn correlated(dim: usize, axis: usize, private: usize, rho: f32) -> Vec<f32> {
    let mut v = vec![0.0; dim];
    v[axis] = rho.sqrt();
    v[private] = (1.0 - rho).sqrt();
    v
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let na: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let nb: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    dot / (na * nb)
}

fn run(
    embedder: StubEmbedder,
    images: &[PathBuf],
    threshold: f32,
) -> Vec<geolens_core::SimilarityGroup> {
    SimilarityGrouper::new(embedder)
        .compute_similarity(images, threshold, |_, _| {}, &CancellationToken::new())
        .unwrap()
}

#[test]
fn two_clusters_sorted_by_average_similarity() {
    // {0,1,2} pairwise 0.90 on axis 0; {3,4} pairwise 0.95 on axis 4.
    let dim = 7;
    let vectors = vec![
        (image(0), correlated(dim, 0, 1, 0.90)),
        (image(1), correlated(dim, 0, 2, 0.90)),
        (image(2), correlated(dim, 0, 3, 0.90)),
        (image(3), correlated(dim, 4, 5, 0.95)),
        (image(4), correlated(dim, 4, 6, 0.95)),
    ];
    let images: Vec<PathBuf> = (0..5).map(image).collect();

    let groups = run(StubEmbedder::with(vectors), &images, 0.85);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].images, vec![image(3), image(4)]);
    assert!((groups[0].avg_similarity - 0.95).abs() < 1e-5);
    assert_eq!(groups[1].images, vec![image(0), image(1), image(2)]);
    assert!((groups[1].avg_similarity - 0.90).abs() < 1e-5);
}

#[test]
fn random_sets_satisfy_partition_and_average_properties() {
    let mut rng = StdRng::seed_from_u64(42);

    for round in 0..20 {
        let n = rng.gen_range(2..40);
        let dim = 8;
        // Positive components keep cosines high enough to form groups.
        let vectors: Vec<(PathBuf, Vec<f32>)> = (0..n)
            .map(|i| (image(i), (0..dim).map(|_| rng.gen_range(0.0..1.0)).collect()))
            .collect();
        let lookup: HashMap<PathBuf, Vec<f32>> = vectors.iter().cloned().collect();
        let images: Vec<PathBuf> = (0..n).map(image).collect();
        let threshold = rng.gen_range(0.7..0.95);

        let groups = run(StubEmbedder::with(vectors), &images, threshold);

        let mut seen = HashSet::new();
        for group in &groups {
            assert!(group.len() >= 2, "round {round}: singleton group");

            let seed = &lookup[group.seed()];
            for member in &group.images {
                assert!(seen.insert(member.clone()), "round {round}: {member:?} reused");
                if member != group.seed() {
                    assert!(cosine(seed, &lookup[member]) >= f64::from(threshold) - 1e-5);
                }
            }

            let mut sum = 0.0;
            let mut pairs = 0;
            for (a, first) in group.images.iter().enumerate() {
                for second in &group.images[a + 1..] {
                    sum += cosine(&lookup[first], &lookup[second]);
                    pairs += 1;
                }
            }
            let expected = sum / f64::from(pairs);
            assert!(
                (f64::from(group.avg_similarity) - expected).abs() < 1e-4,
                "round {round}: avg {} != {expected}",
                group.avg_similarity
            );
        }

        assert!(groups
            .windows(2)
            .all(|w| w[0].avg_similarity >= w[1].avg_similarity));
    }
}

#[test]
fn threshold_one_groups_only_identical_vectors() {
    let vectors = vec![
        (image(0), vec![0.3, 0.4, 0.5]),
        (image(1), vec![0.9, 0.1, 0.0]),
        (image(2), vec![0.3, 0.4, 0.5]),
        (image(3), vec![0.0, 0.0, 1.0]),
    ];
    let images: Vec<PathBuf> = (0..4).map(image).collect();

    let groups = run(StubEmbedder::with(vectors), &images, 1.0);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].images, vec![image(0), image(2)]);
    assert!((groups[0].avg_similarity - 1.0).abs() < 1e-6);
}

#[test]
fn fewer_than_two_readable_images_yield_nothing() {
    let images: Vec<PathBuf> = (0..3).map(image).collect();

    assert!(run(StubEmbedder::default(), &images, 0.5).is_empty());
    assert!(run(
        StubEmbedder::with(vec![(image(1), vec![1.0, 0.0])]),
        &images,
        0.5
    )
    .is_empty());
}

#[test]
fn pre_cancelled_token_stops_before_any_extraction() {
    let token = CancellationToken::new();
    token.cancel();

    let mut grouper = SimilarityGrouper::new(StubEmbedder::with(vec![
        (image(0), vec![1.0]),
        (image(1), vec![1.0]),
    ]));
    let result = grouper.compute_similarity(&[image(0), image(1)], 0.5, |_, _| {}, &token);

    assert!(matches!(result, Err(GroupingError::Cancelled)));
    assert_eq!(grouper.into_inner().calls, 0);
}

#[tokio::test]
async fn runs_on_blocking_pool_with_progress_channel() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let token = CancellationToken::new();
    let images: Vec<PathBuf> = (0..3).map(image).collect();
    let embedder = StubEmbedder::with(vec![
        (image(0), vec![1.0, 0.0]),
        (image(1), vec![1.0, 0.01]),
        (image(2), vec![0.0, 1.0]),
    ]);

    let groups = tokio::task::spawn_blocking(move || {
        SimilarityGrouper::new(embedder).compute_similarity(
            &images,
            0.9,
            |current, total| {
                let _ = tx.send((current, total));
            },
            &token,
        )
    })
    .await
    .unwrap()
    .unwrap();

    let mut progress = vec![];
    while let Some(p) = rx.recv().await {
        progress.push(p);
    }
    assert_eq!(progress, vec![(0, 3), (1, 3), (2, 3), (3, 3)]);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].images, vec![image(0), image(1)]);
}
