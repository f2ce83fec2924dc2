//! Image and text embedding.
//!
//! Two narrow capabilities keep the grouping and ranking algorithms
//! independent of any concrete model:
//!
//! - [`ImageEmbedder`]: image → feature vector, memoized per path. Backed by
//!   [`VisionEmbedder`] (512-d image encoder via ONNX Runtime).
//! - [`JointEmbedder`]: image or text → vectors in a shared space. Backed by
//!   [`ClipEmbedder`] and optional at runtime.
//!
//! # Usage
//!
//! ```rust,ignore
//! use geolens_core::embedding::{ImageEmbedder, VisionEmbedder};
//! use geolens_core::Config;
//!
//! let config = Config::default();
//! let mut embedder = VisionEmbedder::new(&config.vision, &config.limits, &config.model_dir());
//! let features = embedder.embed_image("./photo.jpg".as_ref())?;
//! // features is a Vec<f32> with 512 elements
//! ```

pub mod clip;
mod loader;
pub(crate) mod preprocess;
pub(crate) mod session;
pub mod vision;

use std::path::Path;

use crate::error::EmbeddingError;

pub use clip::ClipEmbedder;
pub use loader::ImageLoader;
pub use vision::VisionEmbedder;

/// Extracts a feature vector per image, caching by path.
///
/// Methods take `&mut self`: one caller drives the cache at a time.
pub trait ImageEmbedder {
    /// Return the feature vector for `path`, computing it on a cache miss.
    fn embed_image(&mut self, path: &Path) -> Result<Vec<f32>, EmbeddingError>;

    /// Drop every memoized vector.
    fn clear_cache(&mut self);
}

/// Embeds images and texts into one shared space.
pub trait JointEmbedder {
    /// Whether the model can be used at all. When `false`, callers skip the
    /// embedding calls entirely.
    fn is_available(&self) -> bool;

    /// Embed a single image.
    fn embed_image(&self, path: &Path) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed many texts, one vector per input in the same order.
    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

impl<T: ImageEmbedder + ?Sized> ImageEmbedder for Box<T> {
    fn embed_image(&mut self, path: &Path) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed_image(path)
    }

    fn clear_cache(&mut self) {
        (**self).clear_cache()
    }
}

impl<T: JointEmbedder + ?Sized> JointEmbedder for Box<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn embed_image(&self, path: &Path) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed_image(path)
    }

    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        (**self).embed_texts(texts)
    }
}
