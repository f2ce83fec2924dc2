//! Near-duplicate grouping over image feature vectors.
//!
//! ```text
//! paths → ImageEmbedder → L2-normalize → N×N cosine matrix → greedy partition → sort
//! ```

pub mod matrix;

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::embedding::ImageEmbedder;
use crate::error::GroupingError;
use crate::math::l2_normalize_in_place;
use crate::types::SimilarityGroup;

pub use matrix::{greedy_partition, IndexGroup, SimilarityMatrix};

/// Groups visually similar images using an injected [`ImageEmbedder`].
pub struct SimilarityGrouper<E> {
    embedder: E,
}

impl<E: ImageEmbedder> SimilarityGrouper<E> {
    pub fn new(embedder: E) -> Self {
        Self { embedder }
    }

    /// Borrow the underlying embedder.
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Consume the grouper and return the embedder.
    pub fn into_inner(self) -> E {
        self.embedder
    }

    /// Partition `images` into groups of near-duplicates.
    ///
    /// `progress(current, total)` fires before each extraction and once more
    /// with `(total, total)` at the end. `cancel` is checked before every
    /// image; an extraction already running always completes.
    ///
    /// Unreadable images are logged and skipped. Fewer than two readable
    /// images yield an empty result. Groups come back sorted by
    /// `avg_similarity`, highest first.
    pub fn compute_similarity<P, F>(
        &mut self,
        images: &[P],
        threshold: f32,
        mut progress: F,
        cancel: &CancellationToken,
    ) -> Result<Vec<SimilarityGroup>, GroupingError>
    where
        P: AsRef<Path>,
        F: FnMut(usize, usize),
    {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(GroupingError::InvalidThreshold(threshold));
        }

        self.embedder.clear_cache();

        let total = images.len();
        let mut valid_paths: Vec<PathBuf> = Vec::with_capacity(total);
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(total);

        for (i, image) in images.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!("Similarity computation cancelled after {i}/{total} images");
                return Err(GroupingError::Cancelled);
            }
            progress(i, total);

            let path = image.as_ref();
            match self.embedder.embed_image(path) {
                Ok(features) => {
                    if let Some(expected) = vectors.first().map(Vec::len) {
                        if features.len() != expected {
                            tracing::warn!(
                                "Skipping {:?}: {} features, expected {}",
                                path,
                                features.len(),
                                expected
                            );
                            continue;
                        }
                    }
                    valid_paths.push(path.to_path_buf());
                    vectors.push(features);
                }
                Err(e) => tracing::warn!("Skipping {:?}: {e}", path),
            }
        }
        progress(total, total);

        if vectors.len() < 2 {
            tracing::debug!(
                "{} readable image(s); nothing to compare",
                vectors.len()
            );
            return Ok(vec![]);
        }

        for v in vectors.iter_mut() {
            l2_normalize_in_place(v);
        }
        let matrix = SimilarityMatrix::from_normalized(&vectors);

        let mut groups: Vec<SimilarityGroup> = greedy_partition(&matrix, threshold)
            .into_iter()
            .map(|g| SimilarityGroup {
                images: g.members.iter().map(|&i| valid_paths[i].clone()).collect(),
                avg_similarity: g.avg_similarity,
            })
            .collect();

        // Stable: ties keep seed order.
        groups.sort_by(|a, b| b.avg_similarity.total_cmp(&a.avg_similarity));

        tracing::info!(
            "Found {} group(s) among {} readable image(s) (threshold {:.2})",
            groups.len(),
            valid_paths.len(),
            threshold
        );
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbeddingError;
    use std::collections::HashMap;

    /// Returns fixed vectors by file name; unknown names are unreadable.
    struct FixedEmbedder {
        vectors: HashMap<PathBuf, Vec<f32>>,
        clears: usize,
        calls: Vec<PathBuf>,
    }

    impl FixedEmbedder {
        fn new(entries: &[(&str, Vec<f32>)]) -> Self {
            Self {
                vectors: entries
                    .iter()
                    .map(|(name, v)| (PathBuf::from(name), v.clone()))
                    .collect(),
                clears: 0,
                calls: vec![],
            }
        }
    }

    impl ImageEmbedder for FixedEmbedder {
        fn embed_image(&mut self, path: &Path) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.push(path.to_path_buf());
            self.vectors
                .get(path)
                .cloned()
                .ok_or_else(|| EmbeddingError::unreadable(path, "not an image"))
        }

        fn clear_cache(&mut self) {
            self.clears += 1;
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_empty_and_single_input_return_nothing() {
        let mut grouper = SimilarityGrouper::new(FixedEmbedder::new(&[("a.jpg", vec![1.0])]));
        let token = CancellationToken::new();

        let none: Vec<PathBuf> = vec![];
        assert!(grouper
            .compute_similarity(&none, 0.5, |_, _| {}, &token)
            .unwrap()
            .is_empty());
        assert!(grouper
            .compute_similarity(&paths(&["a.jpg"]), 0.5, |_, _| {}, &token)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_unreadable_images_are_excluded() {
        let mut grouper = SimilarityGrouper::new(FixedEmbedder::new(&[
            ("a.jpg", vec![1.0, 0.0]),
            ("b.jpg", vec![2.0, 0.0]),
        ]));
        let groups = grouper
            .compute_similarity(
                &paths(&["a.jpg", "broken.jpg", "b.jpg"]),
                0.9,
                |_, _| {},
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].images, paths(&["a.jpg", "b.jpg"]));
        assert!((groups[0].avg_similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_one_readable_among_failures_returns_nothing() {
        let mut grouper = SimilarityGrouper::new(FixedEmbedder::new(&[("a.jpg", vec![1.0])]));
        let groups = grouper
            .compute_similarity(
                &paths(&["x.jpg", "a.jpg", "y.jpg"]),
                0.0,
                |_, _| {},
                &CancellationToken::new(),
            )
            .unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_cache_cleared_once_per_call() {
        let mut grouper = SimilarityGrouper::new(FixedEmbedder::new(&[
            ("a.jpg", vec![1.0, 0.0]),
            ("b.jpg", vec![0.0, 1.0]),
        ]));
        let token = CancellationToken::new();
        let input = paths(&["a.jpg", "b.jpg"]);

        grouper
            .compute_similarity(&input, 0.5, |_, _| {}, &token)
            .unwrap();
        grouper
            .compute_similarity(&input, 0.5, |_, _| {}, &token)
            .unwrap();
        assert_eq!(grouper.embedder().clears, 2);
    }

    #[test]
    fn test_progress_reported_before_each_image() {
        let mut grouper = SimilarityGrouper::new(FixedEmbedder::new(&[
            ("a.jpg", vec![1.0]),
            ("b.jpg", vec![1.0]),
        ]));
        let mut seen = vec![];
        grouper
            .compute_similarity(
                &paths(&["a.jpg", "b.jpg", "c.jpg"]),
                0.5,
                |current, total| seen.push((current, total)),
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(seen, vec![(0, 3), (1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_cancel_between_images() {
        let mut grouper = SimilarityGrouper::new(FixedEmbedder::new(&[
            ("a.jpg", vec![1.0]),
            ("b.jpg", vec![1.0]),
            ("c.jpg", vec![1.0]),
        ]));
        let token = CancellationToken::new();
        let trigger = token.clone();

        let result = grouper.compute_similarity(
            &paths(&["a.jpg", "b.jpg", "c.jpg"]),
            0.5,
            |current, _| {
                if current == 1 {
                    trigger.cancel();
                }
            },
            &token,
        );

        assert!(matches!(result, Err(GroupingError::Cancelled)));
        // b.jpg was already announced, so its extraction ran; c.jpg never started.
        assert_eq!(grouper.embedder().calls, paths(&["a.jpg", "b.jpg"]));
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut grouper = SimilarityGrouper::new(FixedEmbedder::new(&[]));
        let token = CancellationToken::new();
        let input = paths(&["a.jpg"]);

        for bad in [-0.1, 1.1, f32::NAN] {
            assert!(matches!(
                grouper.compute_similarity(&input, bad, |_, _| {}, &token),
                Err(GroupingError::InvalidThreshold(_))
            ));
        }
    }

    #[test]
    fn test_mismatched_dimension_is_skipped() {
        let mut grouper = SimilarityGrouper::new(FixedEmbedder::new(&[
            ("a.jpg", vec![1.0, 0.0]),
            ("odd.jpg", vec![1.0, 0.0, 0.0]),
            ("b.jpg", vec![1.0, 0.0]),
        ]));
        let groups = grouper
            .compute_similarity(
                &paths(&["a.jpg", "odd.jpg", "b.jpg"]),
                0.9,
                |_, _| {},
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].images, paths(&["a.jpg", "b.jpg"]));
    }

    #[test]
    fn test_threshold_one_needs_identical_direction() {
        let mut grouper = SimilarityGrouper::new(FixedEmbedder::new(&[
            ("a.jpg", vec![1.0, 0.0]),
            ("b.jpg", vec![0.99, 0.1]),
            ("c.jpg", vec![0.0, 1.0]),
        ]));
        let groups = grouper
            .compute_similarity(
                &paths(&["a.jpg", "b.jpg", "c.jpg"]),
                1.0,
                |_, _| {},
                &CancellationToken::new(),
            )
            .unwrap();
        assert!(groups.is_empty());
    }
}
