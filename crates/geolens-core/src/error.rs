//! Error types for the GeoLens engine.
//!
//! Errors are grouped by component so callers can tell per-item failures
//! (an unreadable photo) apart from hard initialization failures (a missing
//! seed dataset).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for GeoLens operations.
#[derive(Error, Debug)]
pub enum GeoLensError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Embedding model errors
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Location candidate store errors
    #[error("Location store error: {0}")]
    Store(#[from] StoreError),

    /// Similarity grouping errors
    #[error("Grouping error: {0}")]
    Grouping(#[from] GroupingError),

    /// Location ranking errors
    #[error("Ranking error: {0}")]
    Ranking(#[from] RankingError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised by the vision and joint embedders.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// The image could not be opened, decoded, or was outside the limits.
    /// Non-fatal: the image is dropped from the batch.
    #[error("Unreadable image {path}: {message}")]
    UnreadableImage { path: PathBuf, message: String },

    /// Model files are missing or failed to load.
    #[error("Model unavailable: {message}")]
    ModelUnavailable { message: String },

    /// The model was loaded but inference failed.
    #[error("Inference failed: {message}")]
    Inference { message: String },
}

impl EmbeddingError {
    pub(crate) fn unreadable(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::UnreadableImage {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub(crate) fn unavailable(message: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            message: message.into(),
        }
    }

    pub(crate) fn inference(message: impl Into<String>) -> Self {
        Self::Inference {
            message: message.into(),
        }
    }
}

/// Location candidate store errors.
///
/// `SeedDatasetMissing` and `InvalidSeedData` are fatal at construction.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The seed CSV does not exist
    #[error("Location seed dataset not found: {0}")]
    SeedDatasetMissing(PathBuf),

    /// The seed CSV is empty or a row failed to parse
    #[error("Invalid seed dataset {path}: {message}")]
    InvalidSeedData { path: PathBuf, message: String },

    /// SQLite failure
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem failure around the database file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Similarity grouping errors.
#[derive(Error, Debug)]
pub enum GroupingError {
    /// Threshold outside [0, 1] or NaN
    #[error("Similarity threshold must be between 0.0 and 1.0, got {0}")]
    InvalidThreshold(f32),

    /// The caller cancelled the run between two images
    #[error("Similarity computation cancelled")]
    Cancelled,
}

/// Location ranking errors.
///
/// Model failures never surface here; they degrade to an empty ranking.
#[derive(Error, Debug)]
pub enum RankingError {
    /// Reading candidates from the store failed
    #[error("Failed to load location candidates: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for GeoLens results.
pub type Result<T> = std::result::Result<T, GeoLensError>;
