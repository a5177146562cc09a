//! Environment-backed run configuration.
//!
//! Every setting has a default. Override with `REAR_*` environment
//! variables; the external training loop consumes the hyperparameters, the
//! head consumes everything else via [`Config::head_config`].

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_COARSE_WEIGHT, DEFAULT_GATE_THRESHOLD, DEFAULT_GROUP_SIZE, DEFAULT_MINOR_DIFF,
    DEFAULT_NEGATIVE_BIAS,
};
use crate::head::{HeadConfig, ObjectiveMode};

/// Training-run configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `REAR_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the pretrained backbone checkpoint directory.
    pub model_path: Option<PathBuf>,

    /// Path to the training dataset.
    pub data_path: Option<PathBuf>,

    /// Weight of the relevance loss in the combined objective. Unset
    /// selects the inference-only score-gated mode.
    pub beta: Option<f32>,

    /// Weight of the negative class in the pointwise term. Default: `1.0`.
    pub negative_bias: f32,

    /// Candidate passages per query. Default: `8`.
    pub group_size: usize,

    /// Use the pointwise-only warm-up objective. Default: `false`.
    pub warm_up: bool,

    /// Minimum true-label gap for a pair to carry ranking signal.
    /// Default: `0.0`.
    pub minor_diff: f32,

    /// Learning-rate multiplier for the head, consumed by the external
    /// training loop. Default: `1.0`.
    pub head_scaler: f32,

    /// Multiplier on the projected relevance score. Default: `1.0`.
    pub proj_scaler: f32,

    /// Weight of the pointwise term relative to the pairwise term.
    /// Default: `0.5`.
    pub coarse_weight: f32,

    /// Raw-score threshold for the score-gated mode. Default: `13.0`.
    pub threshold: f32,

    /// Training batch size. Default: `32`.
    pub batch_size: usize,

    /// Optimizer learning rate. Default: `5e-5`.
    pub learning_rate: f64,

    /// Number of training epochs. Default: `3`.
    pub epochs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: None,
            data_path: None,
            beta: None,
            negative_bias: DEFAULT_NEGATIVE_BIAS,
            group_size: DEFAULT_GROUP_SIZE,
            warm_up: false,
            minor_diff: DEFAULT_MINOR_DIFF,
            head_scaler: 1.0,
            proj_scaler: 1.0,
            coarse_weight: DEFAULT_COARSE_WEIGHT,
            threshold: DEFAULT_GATE_THRESHOLD,
            batch_size: 32,
            learning_rate: 5e-5,
            epochs: 3,
        }
    }
}

impl Config {
    const ENV_MODEL_PATH: &'static str = "REAR_MODEL_PATH";
    const ENV_DATA_PATH: &'static str = "REAR_DATA_PATH";
    const ENV_BETA: &'static str = "REAR_BETA";
    const ENV_NEGATIVE_BIAS: &'static str = "REAR_NEGATIVE_BIAS";
    const ENV_GROUP_SIZE: &'static str = "REAR_GROUP_SIZE";
    const ENV_WARM_UP: &'static str = "REAR_WARM_UP";
    const ENV_MINOR_DIFF: &'static str = "REAR_MINOR_DIFF";
    const ENV_HEAD_SCALER: &'static str = "REAR_HEAD_SCALER";
    const ENV_PROJ_SCALER: &'static str = "REAR_PROJ_SCALER";
    const ENV_COARSE_WEIGHT: &'static str = "REAR_COARSE_WEIGHT";
    const ENV_THRESHOLD: &'static str = "REAR_THRESHOLD";
    const ENV_BATCH_SIZE: &'static str = "REAR_BATCH_SIZE";
    const ENV_LEARNING_RATE: &'static str = "REAR_LEARNING_RATE";
    const ENV_EPOCHS: &'static str = "REAR_EPOCHS";

    /// Loads configuration from environment variables (falling back to
    /// defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            model_path: Self::parse_optional_path_from_env(Self::ENV_MODEL_PATH),
            data_path: Self::parse_optional_path_from_env(Self::ENV_DATA_PATH),
            beta: Self::parse_optional_f32_from_env(Self::ENV_BETA)?,
            negative_bias: Self::parse_f32_from_env(
                Self::ENV_NEGATIVE_BIAS,
                defaults.negative_bias,
            )?,
            group_size: Self::parse_usize_from_env(Self::ENV_GROUP_SIZE, defaults.group_size)?,
            warm_up: Self::parse_bool_from_env(Self::ENV_WARM_UP, defaults.warm_up),
            minor_diff: Self::parse_f32_from_env(Self::ENV_MINOR_DIFF, defaults.minor_diff)?,
            head_scaler: Self::parse_f32_from_env(Self::ENV_HEAD_SCALER, defaults.head_scaler)?,
            proj_scaler: Self::parse_f32_from_env(Self::ENV_PROJ_SCALER, defaults.proj_scaler)?,
            coarse_weight: Self::parse_f32_from_env(
                Self::ENV_COARSE_WEIGHT,
                defaults.coarse_weight,
            )?,
            threshold: Self::parse_f32_from_env(Self::ENV_THRESHOLD, defaults.threshold)?,
            batch_size: Self::parse_usize_from_env(Self::ENV_BATCH_SIZE, defaults.batch_size)?,
            learning_rate: Self::parse_f64_from_env(
                Self::ENV_LEARNING_RATE,
                defaults.learning_rate,
            )?,
            epochs: Self::parse_usize_from_env(Self::ENV_EPOCHS, defaults.epochs)?,
        })
    }

    /// Validates basic invariants (does not touch the filesystem except for
    /// configured paths).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.group_size == 0 {
            return Err(ConfigError::InvalidValue {
                var: Self::ENV_GROUP_SIZE,
                reason: "group size must be positive".to_string(),
            });
        }
        if self.negative_bias < 0.0 {
            return Err(ConfigError::InvalidValue {
                var: Self::ENV_NEGATIVE_BIAS,
                reason: format!("must be non-negative, got {}", self.negative_bias),
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                var: Self::ENV_BATCH_SIZE,
                reason: "batch size must be positive".to_string(),
            });
        }
        if self.learning_rate <= 0.0 {
            return Err(ConfigError::InvalidValue {
                var: Self::ENV_LEARNING_RATE,
                reason: format!("must be positive, got {}", self.learning_rate),
            });
        }
        if self.epochs == 0 {
            return Err(ConfigError::InvalidValue {
                var: Self::ENV_EPOCHS,
                reason: "epoch count must be positive".to_string(),
            });
        }

        if let Some(ref path) = self.model_path
            && !path.exists()
        {
            return Err(ConfigError::PathNotFound { path: path.clone() });
        }
        if let Some(ref path) = self.data_path
            && !path.exists()
        {
            return Err(ConfigError::PathNotFound { path: path.clone() });
        }

        Ok(())
    }

    /// Bridges this run configuration into a [`HeadConfig`] for a backbone
    /// of the given hidden width.
    pub fn head_config(&self, hidden_size: usize) -> HeadConfig {
        let mode = match self.beta {
            Some(beta) => ObjectiveMode::Combined { beta },
            None => ObjectiveMode::ScoreGate {
                threshold: self.threshold,
            },
        };

        HeadConfig::new(hidden_size)
            .with_mode(mode)
            .with_warm_up(self.warm_up)
            .with_group_size(self.group_size)
            .with_minor_diff_threshold(self.minor_diff)
            .with_negative_bias(self.negative_bias)
            .with_coarse_weight(self.coarse_weight)
            .with_proj_scaler(self.proj_scaler)
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    fn parse_f32_from_env(var_name: &'static str, default: f32) -> Result<f32, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value.parse().map_err(|_| ConfigError::ParseError {
                var: var_name,
                value,
            }),
            Err(_) => Ok(default),
        }
    }

    fn parse_optional_f32_from_env(var_name: &'static str) -> Result<Option<f32>, ConfigError> {
        match env::var(var_name) {
            Ok(value) if !value.trim().is_empty() => value
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::ParseError {
                    var: var_name,
                    value,
                }),
            _ => Ok(None),
        }
    }

    fn parse_f64_from_env(var_name: &'static str, default: f64) -> Result<f64, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value.parse().map_err(|_| ConfigError::ParseError {
                var: var_name,
                value,
            }),
            Err(_) => Ok(default),
        }
    }

    fn parse_usize_from_env(var_name: &'static str, default: usize) -> Result<usize, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value.parse().map_err(|_| ConfigError::ParseError {
                var: var_name,
                value,
            }),
            Err(_) => Ok(default),
        }
    }

    fn parse_bool_from_env(var_name: &str, default: bool) -> bool {
        env::var(var_name)
            .ok()
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(default)
    }
}
