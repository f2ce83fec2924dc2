//! Reading image files with size limits and content-based format detection.

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::EmbeddingError;

/// Loads images from disk, rejecting oversized or undecodable files.
#[derive(Debug, Clone)]
pub struct ImageLoader {
    limits: LimitsConfig,
}

impl ImageLoader {
    /// Create a loader with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Read and decode an image.
    ///
    /// Every failure maps to `EmbeddingError::UnreadableImage`.
    pub fn load(&self, path: &Path) -> Result<DynamicImage, EmbeddingError> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| EmbeddingError::unreadable(path, format!("Cannot read metadata: {e}")))?;

        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if metadata.len() > max_bytes {
            return Err(EmbeddingError::unreadable(
                path,
                format!(
                    "File too large ({}MB > {}MB)",
                    metadata.len() / (1024 * 1024),
                    self.limits.max_file_size_mb
                ),
            ));
        }

        let bytes = std::fs::read(path)
            .map_err(|e| EmbeddingError::unreadable(path, format!("Cannot open file: {e}")))?;
        let image = Self::decode_bytes(bytes, path)?;

        let (width, height) = image.dimensions();
        let max_dim = self.limits.max_image_dimension;
        if width > max_dim || height > max_dim {
            return Err(EmbeddingError::unreadable(
                path,
                format!("Image too large ({width}x{height} > {max_dim})"),
            ));
        }

        Ok(image)
    }

    /// Decode from bytes, detecting the format from content first and the
    /// extension second.
    fn decode_bytes(bytes: Vec<u8>, path: &Path) -> Result<DynamicImage, EmbeddingError> {
        let mut reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| {
                EmbeddingError::unreadable(path, format!("Cannot detect image format: {e}"))
            })?;

        if reader.format().is_none() {
            let format = ImageFormat::from_path(path).map_err(|_| {
                EmbeddingError::unreadable(path, "Unrecognized image format".to_string())
            })?;
            reader.set_format(format);
        }

        reader
            .decode()
            .map_err(|e| EmbeddingError::unreadable(path, e.to_string()))
    }
}
