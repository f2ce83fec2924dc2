//! Image feature extractor used for near-duplicate detection.
//!
//! Runs an ONNX image encoder exported for feature extraction and produces one
//! pooled feature vector per image. The default export is the CLIP ViT-B/32
//! image encoder (512-d); a ResNet-18 backbone with its classifier removed
//! gives the same length. The output length is checked when the model loads,
//! so a classification export (1000 logits) is rejected instead of silently
//! grouping on class scores.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ndarray::Array4;

use crate::config::{LimitsConfig, PixelNormalization, VisionConfig};
use crate::error::EmbeddingError;

use super::loader::ImageLoader;
use super::preprocess::{preprocess, Normalization, CLIP, IMAGENET};
use super::session::OnnxSession;
use super::ImageEmbedder;

/// The vision model ONNX filename.
pub const VISUAL_MODEL_FILENAME: &str = "visual.onnx";

/// Output names tried in order before falling back to the first output.
const FEATURE_OUTPUTS: &[&str] = &["pooler_output", "features", "image_embeds"];

/// Memoizing image feature extractor.
///
/// The model loads on first use and stays loaded. Vectors are cached per path
/// until [`ImageEmbedder::clear_cache`] is called.
pub struct VisionEmbedder {
    model_path: PathBuf,
    config: VisionConfig,
    loader: ImageLoader,
    session: Option<OnnxSession>,
    cache: HashMap<PathBuf, Vec<f32>>,
}

impl VisionEmbedder {
    /// Create an embedder for `{model_dir}/{config.model}/visual.onnx`.
    ///
    /// Nothing is read from disk until the first embedding is requested.
    pub fn new(config: &VisionConfig, limits: &LimitsConfig, model_dir: &Path) -> Self {
        Self {
            model_path: Self::model_path(config, model_dir),
            config: config.clone(),
            loader: ImageLoader::new(limits.clone()),
            session: None,
            cache: HashMap::new(),
        }
    }

    /// Expected model file path.
    pub fn model_path(config: &VisionConfig, model_dir: &Path) -> PathBuf {
        model_dir.join(&config.model).join(VISUAL_MODEL_FILENAME)
    }

    /// Check whether the model file exists on disk.
    pub fn model_exists(config: &VisionConfig, model_dir: &Path) -> bool {
        Self::model_path(config, model_dir).exists()
    }

    /// Load the model weights. A no-op when already loaded.
    ///
    /// One blank image is run through the graph to confirm it emits
    /// `embedding_dim` features; any other length is `ModelUnavailable`.
    pub fn load(&mut self) -> Result<(), EmbeddingError> {
        if self.session.is_some() {
            return Ok(());
        }
        tracing::info!("Loading vision model from {:?}", self.model_path);
        let session = OnnxSession::load(&self.model_path)?;

        let size = self.config.image_size as usize;
        let blank = Array4::<f32>::zeros((1, 3, size, size));
        let dim = session
            .run_pixels(&blank, FEATURE_OUTPUTS)?
            .first()
            .map_or(0, Vec::len);
        check_feature_dim(dim, self.config.embedding_dim, &self.model_path)?;

        self.session = Some(session);
        tracing::info!("Vision model loaded ({dim}-d features)");
        Ok(())
    }

    /// Whether the model weights are resident.
    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    /// Number of memoized vectors.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn extract(&mut self, path: &Path) -> Result<Vec<f32>, EmbeddingError> {
        self.load()?;
        let image = self.loader.load(path)?;
        let tensor = preprocess(
            &image,
            self.config.resize_to,
            self.config.image_size,
            pixel_stats(self.config.normalization),
        );

        let session = self
            .session
            .as_ref()
            .ok_or_else(|| EmbeddingError::unavailable("Vision model not loaded"))?;
        session
            .run_pixels(&tensor, FEATURE_OUTPUTS)?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::inference("Vision model returned no features"))
    }
}

fn pixel_stats(kind: PixelNormalization) -> &'static Normalization {
    match kind {
        PixelNormalization::Imagenet => &IMAGENET,
        PixelNormalization::Clip => &CLIP,
    }
}

/// Reject graphs whose output is not a feature vector of the expected length.
fn check_feature_dim(got: usize, expected: usize, model_path: &Path) -> Result<(), EmbeddingError> {
    if got == expected {
        return Ok(());
    }
    Err(EmbeddingError::unavailable(format!(
        "{:?} emits {got} values per image, expected {expected}. \
         Use a feature-extraction export (classifier removed) or set vision.embedding_dim.",
        model_path
    )))
}

impl ImageEmbedder for VisionEmbedder {
    fn embed_image(&mut self, path: &Path) -> Result<Vec<f32>, EmbeddingError> {
        if let Some(cached) = self.cache.get(path) {
            return Ok(cached.clone());
        }
        let features = self.extract(path)?;
        self.cache.insert(path.to_path_buf(), features.clone());
        Ok(features)
    }

    fn clear_cache(&mut self) {
        tracing::debug!("Clearing {} cached feature vectors", self.cache.len());
        self.cache.clear();
        self.cache.shrink_to_fit();
    }
}
