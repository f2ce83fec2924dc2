//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.similarity.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::ValidationError(
                "similarity.threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if self.ranking.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "ranking.top_k must be > 0".into(),
            ));
        }
        if self.vision.image_size == 0 || self.vision.resize_to < self.vision.image_size {
            return Err(ConfigError::ValidationError(
                "vision.image_size must be > 0 and no larger than vision.resize_to".into(),
            ));
        }
        if self.vision.embedding_dim == 0 {
            return Err(ConfigError::ValidationError(
                "vision.embedding_dim must be > 0".into(),
            ));
        }
        if self.joint.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "joint.image_size must be > 0".into(),
            ));
        }
        if self.joint.max_length == 0 {
            return Err(ConfigError::ValidationError(
                "joint.max_length must be > 0".into(),
            ));
        }
        if self.joint.text_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "joint.text_batch_size must be > 0".into(),
            ));
        }
        if self.locations.database.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "locations.database must not be empty".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_threshold_out_of_range() {
        let mut config = Config::default();
        config.similarity.threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("similarity.threshold"));

        config.similarity.threshold = -0.1;
        assert!(config.validate().is_err());

        config.similarity.threshold = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = Config::default();
        config.ranking.top_k = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("top_k"));
    }

    #[test]
    fn test_validate_rejects_crop_larger_than_resize() {
        let mut config = Config::default();
        config.vision.image_size = 300;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("vision.image_size"));
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let mut config = Config::default();
        config.joint.text_batch_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("text_batch_size"));
    }
}
