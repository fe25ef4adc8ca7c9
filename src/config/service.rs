//! Settings for the filesystem-backed experiment service.

use crate::core::constants::*;
use crate::core::error::{EnsembleError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding [`ServiceConfig::runs_dir`].
pub const ENV_RUNS_DIR: &str = "ENSEMBLES_RUNS_DIR";
/// Environment variable overriding [`ServiceConfig::train_fraction`].
pub const ENV_TRAIN_FRACTION: &str = "ENSEMBLES_TRAIN_FRACTION";
/// Environment variable overriding [`ServiceConfig::prediction_fallback`].
pub const ENV_PREDICTION_FALLBACK: &str = "ENSEMBLES_PREDICTION_FALLBACK";

/// Experiment service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Root directory holding one subdirectory per experiment
    pub runs_dir: PathBuf,
    /// Leading share of registered rows used for training
    pub train_fraction: f64,
    /// Value returned in place of non-finite predictions
    pub prediction_fallback: f64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            runs_dir: PathBuf::from(DEFAULT_RUNS_DIR),
            train_fraction: DEFAULT_TRAIN_FRACTION,
            prediction_fallback: DEFAULT_PREDICTION_FALLBACK,
        }
    }
}

impl ServiceConfig {
    /// Settings rooted at the given runs directory
    pub fn with_runs_dir<P: Into<PathBuf>>(runs_dir: P) -> Self {
        ServiceConfig {
            runs_dir: runs_dir.into(),
            ..ServiceConfig::default()
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(EnsembleError::invalid_parameter(
                "train_fraction",
                self.train_fraction.to_string(),
                "must be in range (0.0, 1.0)",
            ));
        }

        if !self.prediction_fallback.is_finite() {
            return Err(EnsembleError::invalid_parameter(
                "prediction_fallback",
                self.prediction_fallback.to_string(),
                "must be finite",
            ));
        }

        Ok(())
    }

    /// Load settings from environment variables, defaulting what is unset
    pub fn load_from_environment() -> Result<Self> {
        let mut config = ServiceConfig::default();

        if let Ok(val) = std::env::var(ENV_RUNS_DIR) {
            config.runs_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(ENV_TRAIN_FRACTION) {
            config.train_fraction = val
                .parse()
                .map_err(|_| EnsembleError::config(format!("Invalid {}", ENV_TRAIN_FRACTION)))?;
        }

        if let Ok(val) = std::env::var(ENV_PREDICTION_FALLBACK) {
            config.prediction_fallback = val.parse().map_err(|_| {
                EnsembleError::config(format!("Invalid {}", ENV_PREDICTION_FALLBACK))
            })?;
        }

        config.validate()?;
        Ok(config)
    }
}
