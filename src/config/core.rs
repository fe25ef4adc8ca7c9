//! Experiment configuration and its builder.
//!
//! An [`ExperimentConfig`] names one training run: which ensemble family to
//! build, its size, the per-tree hyperparameters and where the target lives
//! in the registered data. Configurations are stored as JSON inside the
//! experiment directory and can also be read from or written to standalone
//! JSON or TOML files.

use crate::config::tree::{MaxFeatures, TreeParams};
use crate::core::constants::*;
use crate::core::error::{EnsembleError, Result};
use crate::core::types::EnsembleKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Checks that `name` can be used as a single directory under the runs
/// directory.
pub(crate) fn validate_experiment_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(EnsembleError::invalid_parameter("name", name, "must not be empty"));
    }
    if trimmed != name
        || name == "."
        || name == ".."
        || name.contains(|c| c == '/' || c == '\\')
    {
        return Err(EnsembleError::invalid_parameter(
            "name",
            name,
            "must be usable as a directory name",
        ));
    }
    Ok(())
}

fn default_n_estimators() -> usize {
    DEFAULT_N_ESTIMATORS
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_learning_rate() -> f64 {
    DEFAULT_LEARNING_RATE
}

/// Configuration of one ensemble training experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Unique experiment name, also its directory name
    pub name: String,
    /// Ensemble family to train
    pub ml_model: EnsembleKind,
    /// Number of trees
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    /// Maximum tree depth
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Features considered per split
    #[serde(default)]
    pub max_features: MaxFeatures,
    /// Target column in the registered data (last column when absent)
    #[serde(default)]
    pub target_column: Option<String>,
    /// Shrinkage for gradient boosting, ignored by random forests
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Early stopping patience, disabled when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patience: Option<usize>,
    /// Seed for reproducible training
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_state: Option<u64>,
}

impl ExperimentConfig {
    /// Create a configuration with default hyperparameters
    pub fn new<S: Into<String>>(name: S, ml_model: EnsembleKind) -> Self {
        ExperimentConfig {
            name: name.into(),
            ml_model,
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_depth: DEFAULT_MAX_DEPTH,
            max_features: MaxFeatures::All,
            target_column: None,
            learning_rate: DEFAULT_LEARNING_RATE,
            patience: None,
            random_state: None,
        }
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        validate_experiment_name(&self.name)?;

        if self.n_estimators < 1 {
            return Err(EnsembleError::invalid_parameter(
                "n_estimators",
                self.n_estimators.to_string(),
                "must be at least 1",
            ));
        }

        if self.max_depth < 1 {
            return Err(EnsembleError::invalid_parameter(
                "max_depth",
                self.max_depth.to_string(),
                "must be at least 1",
            ));
        }

        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(EnsembleError::invalid_parameter(
                "learning_rate",
                self.learning_rate.to_string(),
                "must be in range (0.0, 1.0]",
            ));
        }

        self.max_features.validate()
    }

    /// Per-tree hyperparameters derived from this configuration
    pub fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: Some(self.max_depth),
            max_features: self.max_features,
            random_state: self.random_state,
            ..TreeParams::default()
        }
    }

    /// Load configuration from a `.json` or `.toml` file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EnsembleError::config(format!("Failed to read config file: {}", e)))?;

        let config: ExperimentConfig = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| EnsembleError::config(format!("Failed to parse JSON config: {}", e)))?,
            Some("toml") => toml::from_str(&content)
                .map_err(|e| EnsembleError::config(format!("Failed to parse TOML config: {}", e)))?,
            _ => {
                return Err(EnsembleError::config(
                    "Unsupported config file format. Use .json or .toml",
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a `.json` or `.toml` file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self)?,
            _ => {
                return Err(EnsembleError::config(
                    "Unsupported config file format. Use .json or .toml",
                ))
            }
        };

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Builder for [`ExperimentConfig`] collecting validation errors as it goes.
#[derive(Debug, Clone)]
pub struct ExperimentConfigBuilder {
    config: ExperimentConfig,
    validation_errors: Vec<String>,
}

impl ExperimentConfigBuilder {
    /// Start a builder for the named experiment
    pub fn new<S: Into<String>>(name: S, ml_model: EnsembleKind) -> Self {
        ExperimentConfigBuilder {
            config: ExperimentConfig::new(name, ml_model),
            validation_errors: Vec::new(),
        }
    }

    /// Set the number of trees
    pub fn n_estimators(mut self, n_estimators: usize) -> Self {
        if n_estimators < 1 {
            self.validation_errors
                .push("n_estimators must be at least 1".to_string());
        }
        self.config.n_estimators = n_estimators;
        self
    }

    /// Set the maximum tree depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        if depth < 1 {
            self.validation_errors
                .push("max_depth must be at least 1".to_string());
        }
        self.config.max_depth = depth;
        self
    }

    /// Set the per-split feature policy
    pub fn max_features(mut self, max_features: MaxFeatures) -> Self {
        self.config.max_features = max_features;
        self
    }

    /// Set the target column name
    pub fn target_column<S: Into<String>>(mut self, column: S) -> Self {
        self.config.target_column = Some(column.into());
        self
    }

    /// Set the learning rate
    pub fn learning_rate(mut self, rate: f64) -> Self {
        if !(rate > 0.0 && rate <= 1.0) {
            self.validation_errors
                .push("learning_rate must be in range (0.0, 1.0]".to_string());
        }
        self.config.learning_rate = rate;
        self
    }

    /// Enable early stopping with the given patience
    pub fn patience(mut self, patience: usize) -> Self {
        self.config.patience = Some(patience);
        self
    }

    /// Set the random seed
    pub fn random_state(mut self, seed: u64) -> Self {
        self.config.random_state = Some(seed);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ExperimentConfig> {
        if !self.validation_errors.is_empty() {
            return Err(EnsembleError::config(format!(
                "Configuration validation failed: {}",
                self.validation_errors.join(", ")
            )));
        }

        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults_from_minimal_json() {
        let config: ExperimentConfig =
            serde_json::from_str(r#"{"name": "exp", "ml_model": "Gradient Boosting"}"#).unwrap();
        assert_eq!(config.ml_model, EnsembleKind::GradientBoosting);
        assert_eq!(config.n_estimators, DEFAULT_N_ESTIMATORS);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.max_features, MaxFeatures::All);
        assert_eq!(config.learning_rate, DEFAULT_LEARNING_RATE);
        assert!(config.target_column.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ExperimentConfig::new("exp", EnsembleKind::RandomForest);
        assert!(config.validate().is_ok());

        config.learning_rate = 0.0;
        assert!(config.validate().is_err());
        config.learning_rate = 1.0;
        assert!(config.validate().is_ok());

        config.n_estimators = 0;
        assert!(config.validate().is_err());
        config.n_estimators = 1;

        config.name = "../escape".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder_accumulates_errors() {
        let result = ExperimentConfigBuilder::new("exp", EnsembleKind::GradientBoosting)
            .n_estimators(0)
            .learning_rate(1.5)
            .build();

        let message = result.unwrap_err().to_string();
        assert!(message.contains("n_estimators"));
        assert!(message.contains("learning_rate"));
    }

    #[test]
    fn test_tree_params_mapping() {
        let config = ExperimentConfigBuilder::new("exp", EnsembleKind::RandomForest)
            .max_depth(4)
            .max_features(MaxFeatures::Sqrt)
            .random_state(7)
            .build()
            .unwrap();

        let params = config.tree_params();
        assert_eq!(params.max_depth, Some(4));
        assert_eq!(params.max_features, MaxFeatures::Sqrt);
        assert_eq!(params.random_state, Some(7));
    }

    #[test]
    fn test_file_round_trip_json_and_toml() {
        let dir = TempDir::new().unwrap();
        let config = ExperimentConfigBuilder::new("exp", EnsembleKind::GradientBoosting)
            .n_estimators(20)
            .max_features(MaxFeatures::Fraction(0.5))
            .target_column("price")
            .patience(3)
            .build()
            .unwrap();

        for file in ["config.json", "config.toml"] {
            let path = dir.path().join(file);
            config.save_to_file(&path).unwrap();
            let loaded = ExperimentConfig::load_from_file(&path).unwrap();
            assert_eq!(loaded, config);
        }

        assert!(config.save_to_file(dir.path().join("config.yaml")).is_err());
    }
}
