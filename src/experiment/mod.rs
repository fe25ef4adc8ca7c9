//! Filesystem-backed experiment service.
//!
//! Each experiment lives in its own directory under the runs directory:
//!
//! ```text
//! <runs_dir>/<name>/
//!   config.json                 ExperimentConfig
//!   train_data.csv              registered data, stored verbatim
//!   model/                      ModelStore directory, once trained
//!   convergence_history.json    losses of the last training run
//! ```

use crate::boosting::{ConvergenceHistory, Ensemble, EnsembleModel, FitOptions};
use crate::config::core::validate_experiment_name;
use crate::config::{ExperimentConfig, ServiceConfig};
use crate::core::constants::*;
use crate::core::error::{EnsembleError, Result};
use crate::core::types::IterationIndex;
use crate::dataset::{CsvLoader, TargetColumn};
use crate::io::ModelStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Headline numbers of a convergence history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningCurveSummary {
    /// Members recorded
    pub n_members: usize,
    /// Lowest training loss
    pub best_train: Option<f64>,
    /// Lowest validation loss
    pub best_val: Option<f64>,
    /// Member with the best monitored loss
    pub best_iteration: Option<IterationIndex>,
}

impl LearningCurveSummary {
    /// Summarizes a history.
    pub fn from_history(history: &ConvergenceHistory) -> Self {
        LearningCurveSummary {
            n_members: history.len(),
            best_train: history.best_train(),
            best_val: history.best_val(),
            best_iteration: history.best_iteration(),
        }
    }
}

/// Registers, trains and queries named experiments.
#[derive(Debug, Clone)]
pub struct ExperimentService {
    config: ServiceConfig,
    loader: CsvLoader,
}

impl ExperimentService {
    /// Opens the service, creating the runs directory if needed.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.runs_dir)?;
        log::debug!("Experiment runs directory: {}", config.runs_dir.display());

        Ok(ExperimentService {
            config,
            loader: CsvLoader::new(),
        })
    }

    /// Opens the service with settings from the environment.
    pub fn from_environment() -> Result<Self> {
        Self::new(ServiceConfig::load_from_environment()?)
    }

    /// Service settings
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn experiment_dir(&self, name: &str) -> PathBuf {
        self.config.runs_dir.join(name)
    }

    fn existing_dir(&self, name: &str) -> Result<PathBuf> {
        validate_experiment_name(name)?;
        let dir = self.experiment_dir(name);
        if !dir.join(EXPERIMENT_CONFIG_FILE).is_file() {
            return Err(EnsembleError::ExperimentNotFound {
                name: name.to_string(),
            });
        }
        Ok(dir)
    }

    /// Names of every registered experiment, sorted.
    pub fn existing_experiments(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.config.runs_dir)? {
            let entry = entry?;
            if !entry.path().join(EXPERIMENT_CONFIG_FILE).is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Registers a new experiment with its training data.
    ///
    /// The target column defaults to the last CSV column; the stored
    /// configuration records the resolved name.
    pub fn register(&self, mut config: ExperimentConfig, csv_data: &[u8]) -> Result<ExperimentConfig> {
        config.validate()?;
        let dir = self.experiment_dir(&config.name);
        if dir.exists() {
            return Err(EnsembleError::ExperimentExists { name: config.name });
        }

        let target = match config.target_column.clone() {
            Some(column) => column,
            None => self
                .loader
                .headers(csv_data)?
                .pop()
                .ok_or_else(|| EnsembleError::invalid_input("CSV data has no columns"))?,
        };
        let dataset = self
            .loader
            .load_bytes(csv_data, TargetColumn::Required(&target))?;
        if dataset.n_rows() == 0 {
            return Err(EnsembleError::invalid_input("training data has no rows"));
        }
        if dataset.n_features() == 0 {
            return Err(EnsembleError::invalid_input("training data has no feature columns"));
        }
        config.target_column = Some(target);

        fs::create_dir_all(&dir)?;
        let written = config
            .save_to_file(dir.join(EXPERIMENT_CONFIG_FILE))
            .and_then(|_| Ok(fs::write(dir.join(EXPERIMENT_DATA_FILE), csv_data)?));
        if let Err(err) = written {
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                log::warn!("Failed to remove partial experiment {}: {}", dir.display(), cleanup);
            }
            return Err(err);
        }

        log::info!(
            "Registered experiment '{}' ({}, {} rows x {} features)",
            config.name,
            config.ml_model,
            dataset.n_rows(),
            dataset.n_features()
        );
        Ok(config)
    }

    /// Stored configuration of an experiment.
    pub fn experiment_config(&self, name: &str) -> Result<ExperimentConfig> {
        let dir = self.existing_dir(name)?;
        ExperimentConfig::load_from_file(dir.join(EXPERIMENT_CONFIG_FILE))
    }

    /// True until a model has been trained and stored.
    pub fn needs_training(&self, name: &str) -> Result<bool> {
        let dir = self.existing_dir(name)?;
        Ok(!ModelStore::is_model_dir(dir.join(EXPERIMENT_MODEL_DIR)))
    }

    /// Trains the experiment's ensemble, replacing any previous model.
    ///
    /// The leading `train_fraction` of the registered rows is used for
    /// fitting and the remainder for validation. Tracing is always on.
    pub fn train(&self, name: &str) -> Result<ConvergenceHistory> {
        let dir = self.existing_dir(name)?;
        let config = self.experiment_config(name)?;

        let dataset = self.load_training_data(&dir, &config)?;
        let (train, val) = dataset.split_fraction(self.config.train_fraction)?;
        if train.n_rows() == 0 {
            return Err(EnsembleError::invalid_input(format!(
                "experiment '{}' has too few rows to train on",
                name
            )));
        }
        let train_target = train
            .target()
            .ok_or_else(|| EnsembleError::internal("training data has no target"))?;

        let mut options = FitOptions::new().with_trace(true);
        if let (true, Some(val_target)) = (val.n_rows() > 0, val.target()) {
            options = options.with_validation(val.features(), val_target);
        }
        if let Some(patience) = config.patience {
            options = options.with_patience(patience);
        }

        log::info!(
            "Training experiment '{}': {} training rows, {} validation rows",
            name,
            train.n_rows(),
            val.n_rows()
        );

        let mut model = EnsembleModel::from_config(&config)?;
        let history = model
            .fit(train.features(), train_target, options)?
            .ok_or_else(|| EnsembleError::internal("traced fit returned no history"))?;

        let model_dir = dir.join(EXPERIMENT_MODEL_DIR);
        if model_dir.exists() {
            fs::remove_dir_all(&model_dir)?;
        }
        ModelStore::dump(&model, &model_dir)?;

        let history_json = serde_json::to_string_pretty(&history)?;
        fs::write(dir.join(EXPERIMENT_HISTORY_FILE), history_json)?;

        log::info!(
            "Trained experiment '{}' with {} trees",
            name,
            model.n_estimators()
        );
        Ok(history)
    }

    /// Losses recorded by the last training run.
    pub fn convergence_history(&self, name: &str) -> Result<ConvergenceHistory> {
        let dir = self.existing_dir(name)?;
        let path = dir.join(EXPERIMENT_HISTORY_FILE);
        if self.needs_training(name)? || !path.is_file() {
            return Err(EnsembleError::NotTrained {
                name: name.to_string(),
            });
        }
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    /// Predicts every row of headered CSV data with the trained model.
    ///
    /// The target column is dropped if present. Non-finite predictions are
    /// replaced by the configured fallback.
    pub fn predict(&self, name: &str, csv_data: &[u8]) -> Result<Vec<f64>> {
        let dir = self.existing_dir(name)?;
        if self.needs_training(name)? {
            return Err(EnsembleError::NotTrained {
                name: name.to_string(),
            });
        }
        let config = self.experiment_config(name)?;

        let target = match config.target_column.as_deref() {
            Some(column) => TargetColumn::Ignore(column),
            None => TargetColumn::None,
        };
        let dataset = self.loader.load_bytes(csv_data, target)?;

        let model = ModelStore::load(config.ml_model, dir.join(EXPERIMENT_MODEL_DIR))?;
        let predictions = model.predict(dataset.features())?;

        let fallback = self.config.prediction_fallback;
        let (sanitized, replaced) = replace_non_finite(predictions.iter().copied(), fallback);
        if replaced > 0 {
            log::warn!(
                "Replaced {} non-finite predictions of '{}' with {}",
                replaced,
                name,
                fallback
            );
        }
        Ok(sanitized)
    }

    /// Summary of the last training run.
    pub fn learning_curve_summary(&self, name: &str) -> Result<LearningCurveSummary> {
        Ok(LearningCurveSummary::from_history(&self.convergence_history(name)?))
    }

    fn load_training_data(&self, dir: &Path, config: &ExperimentConfig) -> Result<crate::dataset::Dataset> {
        let path = dir.join(EXPERIMENT_DATA_FILE);
        let target = match config.target_column.clone() {
            Some(column) => column,
            None => self
                .loader
                .headers(fs::File::open(&path)?)?
                .pop()
                .ok_or_else(|| EnsembleError::invalid_input("stored data has no columns"))?,
        };
        self.loader.load_path(path, TargetColumn::Required(&target))
    }
}

/// Replaces every non-finite value with `fallback`, counting replacements.
fn replace_non_finite(values: impl Iterator<Item = f64>, fallback: f64) -> (Vec<f64>, usize) {
    let mut replaced = 0;
    let sanitized = values
        .map(|value| {
            if value.is_finite() {
                value
            } else {
                replaced += 1;
                fallback
            }
        })
        .collect();
    (sanitized, replaced)
}
