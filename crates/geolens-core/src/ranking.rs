//! Zero-shot location ranking.
//!
//! Scores one image against every stored candidate description in a joint
//! image/text space, turns the cosine similarities into a probability
//! distribution with softmax, and returns the most likely locations.

use std::path::Path;

use crate::config::Config;
use crate::embedding::{ClipEmbedder, JointEmbedder};
use crate::error::{EmbeddingError, RankingError};
use crate::locations::{CandidateSource, LocationCandidateStore};
use crate::math::{dot, l2_normalize, softmax, top_k_indices};
use crate::types::{LocationCandidate, LocationPrediction};

/// Ranks stored candidate locations for a photo.
///
/// Candidates are read from the store on first use and kept for the life of
/// the ranker, as are their description embeddings once computed.
pub struct LocationRanker<J, S = LocationCandidateStore> {
    embedder: J,
    store: S,
    candidates: Option<Vec<LocationCandidate>>,
    text_embeddings: Option<Vec<Vec<f32>>>,
}

impl LocationRanker<ClipEmbedder> {
    /// Ranker over the configured CLIP model and candidate store.
    ///
    /// Opens (and on first use seeds) the store; the model itself still loads
    /// lazily on the first prediction.
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let store = LocationCandidateStore::open(&config.database_path(), &config.seed_path())?;
        let embedder = ClipEmbedder::new(&config.joint, &config.limits, &config.model_dir());
        Ok(Self::new(embedder, store))
    }
}

impl<J: JointEmbedder, S: CandidateSource> LocationRanker<J, S> {
    pub fn new(embedder: J, store: S) -> Self {
        Self {
            embedder,
            store,
            candidates: None,
            text_embeddings: None,
        }
    }

    /// Borrow the candidate store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Predict up to `top_k` locations for `image`, most likely first.
    ///
    /// Model trouble (no model files, unreadable image, failed inference)
    /// yields an empty list and a warning. Only store failures are errors.
    pub fn predict_location(
        &mut self,
        image: &Path,
        top_k: usize,
    ) -> Result<Vec<LocationPrediction>, RankingError> {
        if !self.embedder.is_available() {
            tracing::warn!("Joint image/text model not available; skipping location prediction");
            return Ok(vec![]);
        }
        if top_k == 0 {
            return Ok(vec![]);
        }

        self.load_candidates()?;
        if self.candidates.as_ref().map_or(true, Vec::is_empty) {
            tracing::warn!("Location store is empty");
            return Ok(vec![]);
        }

        let similarities = match self.similarities(image) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Location prediction failed for {:?}: {e}", image);
                return Ok(vec![]);
            }
        };

        let candidates = self.candidates.as_deref().unwrap_or_default();
        Ok(rank_similarities(&similarities, candidates, top_k))
    }

    fn load_candidates(&mut self) -> Result<(), RankingError> {
        if self.candidates.is_none() {
            let candidates = self.store.get_all_locations()?;
            tracing::info!("Loaded {} candidate locations", candidates.len());
            self.candidates = Some(candidates);
        }
        Ok(())
    }

    /// Cosine similarity between the image and each candidate description.
    fn similarities(&mut self, image: &Path) -> Result<Vec<f32>, EmbeddingError> {
        let image_embedding = l2_normalize(&self.embedder.embed_image(image)?);

        if self.text_embeddings.is_none() {
            let descriptions: Vec<String> = self
                .candidates
                .iter()
                .flatten()
                .map(|c| c.description.clone())
                .collect();
            let embeddings = self.embedder.embed_texts(&descriptions)?;
            if embeddings.len() != descriptions.len() {
                return Err(EmbeddingError::inference(format!(
                    "Expected {} description embeddings, got {}",
                    descriptions.len(),
                    embeddings.len()
                )));
            }
            self.text_embeddings = Some(embeddings.iter().map(|e| l2_normalize(e)).collect());
        }

        let texts = self.text_embeddings.as_deref().unwrap_or_default();
        if let Some(first) = texts.first() {
            if first.len() != image_embedding.len() {
                return Err(EmbeddingError::inference(format!(
                    "Image embedding has {} dimensions, descriptions have {}",
                    image_embedding.len(),
                    first.len()
                )));
            }
        }

        Ok(texts.iter().map(|t| dot(&image_embedding, t)).collect())
    }
}

/// Softmax `similarities` over all candidates and keep the `top_k` most
/// probable, highest first.
///
/// `similarities[i]` scores `candidates[i]`. Probabilities are computed over
/// the full set, so truncation does not renormalize them.
pub fn rank_similarities(
    similarities: &[f32],
    candidates: &[LocationCandidate],
    top_k: usize,
) -> Vec<LocationPrediction> {
    let probabilities = softmax(similarities);
    top_k_indices(&probabilities, top_k)
        .into_iter()
        .filter_map(|i| {
            candidates.get(i).map(|c| LocationPrediction {
                latitude: c.latitude,
                longitude: c.longitude,
                confidence: probabilities[i],
                description: c.description.clone(),
            })
        })
        .collect()
}
