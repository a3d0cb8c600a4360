//! Model configuration loaded from JSON.

use crate::error::Result;
use crate::init::InitConfig;
use serde::Deserialize;
use std::path::Path;

fn default_beta() -> f32 {
    1.0
}

/// Shallow fusion settings.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FusionConfig {
    /// Name of the language-model weights among the readout inputs
    pub lm_weights_name: String,

    /// Scale of the language-model probabilities
    #[serde(default = "default_beta")]
    pub beta: f32,
}

/// Top-level brick configuration.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct BricksConfig {
    #[serde(default)]
    pub init: InitConfig,

    #[serde(default)]
    pub fusion: Option<FusionConfig>,
}

impl BricksConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::from_json(&std::fs::read_to_string(path.as_ref())?)?;
        tracing::debug!(path = %path.as_ref().display(), "config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, Error};
    use crate::init::Initialization;

    #[test]
    fn empty_config_uses_defaults() {
        let config = BricksConfig::from_json("{}").unwrap();

        assert_eq!(config, BricksConfig::default());
        assert!(config.fusion.is_none());
    }

    #[test]
    fn parses_fusion_and_init() {
        let config = BricksConfig::from_json(
            r#"{
                "init": {"weights": {"scheme": "uniform", "mean": 0.0, "width": 0.2}, "seed": 3},
                "fusion": {"lm_weights_name": "lm_weights"}
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.init.weights,
            Initialization::Uniform {
                mean: 0.0,
                width: 0.2
            }
        );
        assert_eq!(config.init.seed, Some(3));
        let fusion = config.fusion.unwrap();
        assert_eq!(fusion.lm_weights_name, "lm_weights");
        assert_eq!(fusion.beta, 1.0);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = BricksConfig::from_json("{").unwrap_err();

        assert!(matches!(err, Error::Config(ConfigError::Json(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = BricksConfig::from_file("/nonexistent/lvsr.json").unwrap_err();

        assert!(matches!(err, Error::Config(ConfigError::Io(_))));
    }
}
