//! Configuration management for GeoLens.
//!
//! Configuration is loaded from the platform config directory with defaults
//! for every field, so an absent or partial file is always valid.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for GeoLens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Similarity grouping settings
    pub similarity: SimilarityConfig,

    /// Vision feature extractor settings
    pub vision: VisionConfig,

    /// Joint image/text model settings
    pub joint: JointConfig,

    /// Location candidate store settings
    pub locations: LocationsConfig,

    /// Location ranking settings
    pub ranking: RankingConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.geolens.geolens/config.toml
    /// - Linux: ~/.config/geolens/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\geolens\config\config.toml
    ///
    /// Falls back to ~/.geolens/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "geolens", "geolens")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".geolens").join("config.toml")
            })
    }

    /// Resolved cache directory (with ~ expansion).
    pub fn cache_dir(&self) -> PathBuf {
        let path_str = self.general.cache_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Directory holding downloaded model weights.
    pub fn model_dir(&self) -> PathBuf {
        self.cache_dir().join("models")
    }

    /// Path of the SQLite candidate store.
    pub fn database_path(&self) -> PathBuf {
        self.cache_dir().join(&self.locations.database)
    }

    /// Path of the seed CSV used to populate the candidate store.
    pub fn seed_path(&self) -> PathBuf {
        match &self.locations.seed_path {
            Some(path) => {
                let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
                PathBuf::from(expanded)
            }
            None => self.cache_dir().join("world_locations.csv"),
        }
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!((config.similarity.threshold - 0.85).abs() < f32::EPSILON);
        assert_eq!(config.ranking.top_k, 5);
        assert_eq!(config.vision.model, "clip-vit-b32-vision");
        assert_eq!(config.vision.embedding_dim, 512);
        assert_eq!(config.vision.normalization, PixelNormalization::Clip);
        assert_eq!(config.joint.max_length, 77);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[similarity]"));
        assert!(toml.contains("[locations]"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[similarity]\nthreshold = 0.9\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!((config.similarity.threshold - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.ranking.top_k, 5);
    }

    #[test]
    fn test_resnet_style_vision_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[vision]\nmodel = \"resnet18\"\nresize_to = 256\nnormalization = \"imagenet\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.vision.normalization, PixelNormalization::Imagenet);
        assert_eq!(config.vision.resize_to, 256);
        assert_eq!(config.vision.embedding_dim, 512);
    }

    #[test]
    fn test_paths_derive_from_cache_dir() {
        let mut config = Config::default();
        config.general.cache_dir = PathBuf::from("/var/cache/geolens");
        assert_eq!(
            config.database_path(),
            PathBuf::from("/var/cache/geolens/locations.db")
        );
        assert_eq!(
            config.seed_path(),
            PathBuf::from("/var/cache/geolens/world_locations.csv")
        );
        assert_eq!(config.model_dir(), PathBuf::from("/var/cache/geolens/models"));
    }

    #[test]
    fn test_explicit_seed_path_wins() {
        let mut config = Config::default();
        config.locations.seed_path = Some(PathBuf::from("/data/places.csv"));
        assert_eq!(config.seed_path(), PathBuf::from("/data/places.csv"));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[similarity\nthreshold = ").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseError(_))
        ));
    }
}
