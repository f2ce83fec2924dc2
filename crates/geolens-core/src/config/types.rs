//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding downloaded models and the location database
    pub cache_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("~/.geolens"),
        }
    }
}

/// Similarity grouping settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Minimum cosine similarity to the group seed (0.0 - 1.0)
    pub threshold: f32,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self { threshold: 0.85 }
    }
}

/// Per-channel pixel statistics a vision export was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelNormalization {
    /// torchvision ImageNet mean/std (ResNet feature exports)
    Imagenet,
    /// OpenAI CLIP mean/std
    Clip,
}

/// Vision feature extractor settings.
///
/// The default is the CLIP ViT-B/32 image encoder exported for feature
/// extraction, which emits one 512-d pooled embedding per image. A ResNet-18
/// export with its classifier removed works too with `normalization =
/// "imagenet"` and `resize_to = 256`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Model directory name under `{cache_dir}/models`
    pub model: String,

    /// Center-crop size fed to the network
    pub image_size: u32,

    /// Shorter-side resize applied before cropping
    pub resize_to: u32,

    /// Pixel statistics applied after scaling to [0, 1]
    pub normalization: PixelNormalization,

    /// Length of the feature vector the model must produce
    pub embedding_dim: usize,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model: "clip-vit-b32-vision".to_string(),
            image_size: 224,
            resize_to: 224,
            normalization: PixelNormalization::Clip,
            embedding_dim: 512,
        }
    }
}

/// Joint image/text (CLIP) model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JointConfig {
    /// Model directory name under `{cache_dir}/models`
    pub model: String,

    /// Image input size for the vision tower
    pub image_size: u32,

    /// Token sequence length for the text tower
    pub max_length: usize,

    /// Descriptions encoded per text-tower call
    pub text_batch_size: usize,
}

impl Default for JointConfig {
    fn default() -> Self {
        Self {
            model: "clip-vit-base-patch32".to_string(),
            image_size: 224,
            max_length: 77,
            text_batch_size: 256,
        }
    }
}

/// Location candidate store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationsConfig {
    /// Seed CSV path. Defaults to `{cache_dir}/world_locations.csv`.
    pub seed_path: Option<PathBuf>,

    /// SQLite file name inside the cache directory
    pub database: String,
}

impl Default for LocationsConfig {
    fn default() -> Self {
        Self {
            seed_path: None,
            database: "locations.db".to_string(),
        }
    }
}

/// Location ranking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Number of predictions returned per image
    pub top_k: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 20000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
