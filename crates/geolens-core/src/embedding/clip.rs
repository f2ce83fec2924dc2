//! CLIP joint image/text embedder.
//!
//! Loads the CLIP vision and text towers (with projection heads) plus the
//! tokenizer from `{model_dir}/{model}/`. Image and text vectors land in the
//! same 512-dimensional space, so their dot product ranks descriptions
//! against a photo.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::config::{JointConfig, LimitsConfig};
use crate::error::EmbeddingError;

use super::loader::ImageLoader;
use super::preprocess::{preprocess, CLIP};
use super::session::OnnxSession;
use super::JointEmbedder;

pub const VISION_MODEL_FILENAME: &str = "vision_model.onnx";
pub const TEXT_MODEL_FILENAME: &str = "text_model.onnx";
pub const TOKENIZER_FILENAME: &str = "tokenizer.json";

/// CLIP end-of-text token; the text tower pools at its position.
const EOS_TOKEN: &str = "<|endoftext|>";

/// Loaded towers, created once on first use.
struct ClipModels {
    vision: OnnxSession,
    text: OnnxSession,
    tokenizer: tokenizers::Tokenizer,
    eos_id: Option<u32>,
}

/// Optional joint embedder backed by CLIP ONNX exports.
pub struct ClipEmbedder {
    dir: PathBuf,
    config: JointConfig,
    loader: ImageLoader,
    models: OnceLock<ClipModels>,
}

impl ClipEmbedder {
    /// Create an embedder reading from `{model_dir}/{config.model}/`.
    ///
    /// Nothing is loaded until the first embedding call.
    pub fn new(config: &JointConfig, limits: &LimitsConfig, model_dir: &Path) -> Self {
        Self {
            dir: model_dir.join(&config.model),
            config: config.clone(),
            loader: ImageLoader::new(limits.clone()),
            models: OnceLock::new(),
        }
    }

    /// Check whether all three model files exist.
    pub fn model_exists(config: &JointConfig, model_dir: &Path) -> bool {
        files_present(&model_dir.join(&config.model))
    }

    fn models(&self) -> Result<&ClipModels, EmbeddingError> {
        if let Some(models) = self.models.get() {
            return Ok(models);
        }

        tracing::info!("Loading CLIP model from {:?}", self.dir);
        let vision = OnnxSession::load(&self.dir.join(VISION_MODEL_FILENAME))?;
        let text = OnnxSession::load(&self.dir.join(TEXT_MODEL_FILENAME))?;

        let tokenizer_path = self.dir.join(TOKENIZER_FILENAME);
        if !tokenizer_path.exists() {
            return Err(EmbeddingError::unavailable(format!(
                "Tokenizer not found at {:?}. Run `geolens models download` first.",
                tokenizer_path
            )));
        }
        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbeddingError::unavailable(format!("Failed to load tokenizer: {e}")))?;
        let eos_id = tokenizer.token_to_id(EOS_TOKEN);

        tracing::info!("CLIP model loaded");
        Ok(self.models.get_or_init(|| ClipModels {
            vision,
            text,
            tokenizer,
            eos_id,
        }))
    }
}

impl JointEmbedder for ClipEmbedder {
    fn is_available(&self) -> bool {
        self.models.get().is_some() || files_present(&self.dir)
    }

    fn embed_image(&self, path: &Path) -> Result<Vec<f32>, EmbeddingError> {
        let models = self.models()?;
        let image = self.loader.load(path)?;
        let size = self.config.image_size;
        let tensor = preprocess(&image, size, size, &CLIP);

        models
            .vision
            .run_pixels(&tensor, &["image_embeds"])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::inference("CLIP vision tower returned no embedding"))
    }

    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let models = self.models()?;
        let max_length = self.config.max_length;
        let mut embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.config.text_batch_size) {
            let encodings = models
                .tokenizer
                .encode_batch(chunk.to_vec(), true)
                .map_err(|e| EmbeddingError::inference(format!("Tokenization failed: {e}")))?;
            let ids: Vec<&[u32]> = encodings.iter().map(|e| e.get_ids()).collect();
            let (input_ids, attention_mask) = pack_tokens(&ids, max_length, models.eos_id);

            let batch = models.text.run_tokens(
                input_ids,
                attention_mask,
                chunk.len(),
                max_length,
                &["text_embeds"],
            )?;
            embeddings.extend(batch);
        }

        tracing::debug!("Encoded {} descriptions", embeddings.len());
        Ok(embeddings)
    }
}

fn files_present(dir: &Path) -> bool {
    [VISION_MODEL_FILENAME, TEXT_MODEL_FILENAME, TOKENIZER_FILENAME]
        .iter()
        .all(|f| dir.join(f).exists())
}

/// Pack token sequences into fixed-length `input_ids` and `attention_mask`
/// buffers of shape `[batch, max_length]`.
///
/// Sequences longer than `max_length` are truncated with the final slot
/// rewritten to `eos_id`, so the pooled position still exists.
fn pack_tokens(
    sequences: &[&[u32]],
    max_length: usize,
    eos_id: Option<u32>,
) -> (Vec<i64>, Vec<i64>) {
    let mut input_ids = vec![0i64; sequences.len() * max_length];
    let mut attention_mask = vec![0i64; sequences.len() * max_length];

    for (i, ids) in sequences.iter().enumerate() {
        let row = i * max_length;
        let len = ids.len().min(max_length);
        for (j, &id) in ids.iter().take(len).enumerate() {
            input_ids[row + j] = id as i64;
            attention_mask[row + j] = 1;
        }
        if ids.len() > max_length {
            if let Some(eos) = eos_id {
                input_ids[row + max_length - 1] = eos as i64;
            }
        }
    }

    (input_ids, attention_mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_tokens_pads_and_masks() {
        let a: &[u32] = &[49406, 10, 11, 49407];
        let b: &[u32] = &[49406, 12, 49407];
        let (ids, mask) = pack_tokens(&[a, b], 6, Some(49407));

        assert_eq!(ids, vec![49406, 10, 11, 49407, 0, 0, 49406, 12, 49407, 0, 0, 0]);
        assert_eq!(mask, vec![1, 1, 1, 1, 0, 0, 1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn test_pack_tokens_truncates_with_eos() {
        let long: &[u32] = &[49406, 1, 2, 3, 4, 5, 49407];
        let (ids, mask) = pack_tokens(&[long], 4, Some(49407));

        assert_eq!(ids, vec![49406, 1, 2, 49407]);
        assert_eq!(mask, vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_unavailable_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = ClipEmbedder::new(
            &JointConfig::default(),
            &LimitsConfig::default(),
            dir.path(),
        );
        assert!(!embedder.is_available());

        let err = embedder.embed_texts(&["Eiffel Tower".to_string()]).unwrap_err();
        assert!(matches!(err, EmbeddingError::ModelUnavailable { .. }));
    }

    #[test]
    fn test_embed_no_texts_skips_loading() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = ClipEmbedder::new(
            &JointConfig::default(),
            &LimitsConfig::default(),
            dir.path(),
        );
        assert!(embedder.embed_texts(&[]).unwrap().is_empty());
    }
}
