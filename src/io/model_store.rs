//! Directory-based ensemble persistence.
//!
//! A stored model is a directory holding:
//!
//! ```text
//! <model>/
//!   params.json          n_estimators, kind, tree_params
//!                        (+ learning_rate, const_prediction for boosting)
//!   trees/
//!     tree_0000.bin      member 0 (bincode)
//!     tree_0001.bin      member 1
//!     ...
//! ```
//!
//! Floats are written verbatim (bincode bit patterns, round-trip JSON), so
//! a reloaded ensemble predicts exactly what the dumped one did.

use crate::boosting::{Ensemble, EnsembleModel, GradientBoostingMSE, RandomForestMSE};
use crate::config::tree::TreeParams;
use crate::core::constants::*;
use crate::core::error::{EnsembleError, Result};
use crate::core::traits::Persistable;
use crate::core::types::EnsembleKind;
use crate::tree::RegressionTree;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Contents of `params.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Number of stored members
    pub n_estimators: usize,
    /// Ensemble kind; older dumps may omit it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EnsembleKind>,
    /// Boosting shrinkage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f64>,
    /// Boosting base value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub const_prediction: Option<f64>,
    /// Per-tree hyperparameters used at fit time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_params: Option<TreeParams>,
}

impl ModelParams {
    /// Captures the scalar state of a fitted ensemble.
    pub fn from_ensemble<E: Ensemble + ?Sized>(ensemble: &E) -> Self {
        ModelParams {
            n_estimators: ensemble.trees().len(),
            kind: Some(ensemble.kind()),
            learning_rate: ensemble.learning_rate(),
            const_prediction: ensemble.const_prediction(),
            tree_params: Some(ensemble.tree_params().clone()),
        }
    }
}

/// Saves and loads ensembles as model directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelStore;

impl ModelStore {
    /// File name of member `index`.
    pub fn tree_file_name(index: usize) -> String {
        format!(
            "{}{:0width$}.{}",
            TREE_FILE_PREFIX,
            index,
            TREE_FILE_EXTENSION,
            width = TREE_INDEX_WIDTH
        )
    }

    /// True when `dir` holds a parameters file.
    pub fn is_model_dir<P: AsRef<Path>>(dir: P) -> bool {
        dir.as_ref().join(PARAMS_FILE_NAME).is_file()
    }

    /// Writes a fitted ensemble to a new directory.
    ///
    /// Fails with `AlreadyExists` if `dir` exists, leaving it untouched.
    /// Missing parent directories are created. If writing fails midway the
    /// new directory is removed again.
    pub fn dump<E: Ensemble + ?Sized, P: AsRef<Path>>(ensemble: &E, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !ensemble.is_fitted() {
            return Err(EnsembleError::not_fitted("dump"));
        }

        if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        match fs::create_dir(dir) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(EnsembleError::already_exists(dir));
            }
            Err(err) => return Err(err.into()),
        }

        if let Err(err) = Self::write_contents(ensemble, dir) {
            if let Err(cleanup) = fs::remove_dir_all(dir) {
                log::warn!("Failed to remove partial model at {}: {}", dir.display(), cleanup);
            }
            return Err(err);
        }

        log::info!(
            "Saved {} with {} trees to {}",
            ensemble.kind(),
            ensemble.trees().len(),
            dir.display()
        );
        Ok(())
    }

    fn write_contents<E: Ensemble + ?Sized>(ensemble: &E, dir: &Path) -> Result<()> {
        let params = ModelParams::from_ensemble(ensemble);
        let mut writer = BufWriter::new(fs::File::create(dir.join(PARAMS_FILE_NAME))?);
        serde_json::to_writer_pretty(&mut writer, &params)?;
        writer.flush()?;

        let trees_dir = dir.join(TREES_DIR_NAME);
        fs::create_dir(&trees_dir)?;
        for (index, tree) in ensemble.trees().iter().enumerate() {
            tree.save_to_file(trees_dir.join(Self::tree_file_name(index)))?;
        }
        Ok(())
    }

    /// Reads and checks `params.json`.
    pub fn read_params<P: AsRef<Path>>(dir: P) -> Result<ModelParams> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(EnsembleError::not_found(dir));
        }

        let path = dir.join(PARAMS_FILE_NAME);
        let text = fs::read_to_string(&path).map_err(|err| {
            EnsembleError::corrupt_model(dir, format!("cannot read {}: {}", PARAMS_FILE_NAME, err))
        })?;
        let params: ModelParams = serde_json::from_str(&text).map_err(|err| {
            EnsembleError::corrupt_model(dir, format!("cannot parse {}: {}", PARAMS_FILE_NAME, err))
        })?;

        if params.n_estimators == 0 {
            return Err(EnsembleError::corrupt_model(dir, "n_estimators is zero"));
        }
        Ok(params)
    }

    /// Loads an ensemble of the given kind.
    pub fn load<P: AsRef<Path>>(kind: EnsembleKind, dir: P) -> Result<EnsembleModel> {
        let dir = dir.as_ref();
        let params = Self::read_params(dir)?;
        if let Some(stored) = params.kind {
            if stored != kind {
                return Err(EnsembleError::corrupt_model(
                    dir,
                    format!("stored model is a {}, expected a {}", stored, kind),
                ));
            }
        }

        let trees = Self::read_trees(dir, params.n_estimators)?;
        let tree_params = params.tree_params.clone().unwrap_or_default();

        let model = match kind {
            EnsembleKind::RandomForest => EnsembleModel::RandomForest(
                RandomForestMSE::from_trees(tree_params, trees)
                    .map_err(|err| EnsembleError::corrupt_model(dir, err.to_string()))?,
            ),
            EnsembleKind::GradientBoosting => {
                let learning_rate = params.learning_rate.ok_or_else(|| {
                    EnsembleError::corrupt_model(dir, "learning_rate is missing")
                })?;
                let const_prediction = params.const_prediction.ok_or_else(|| {
                    EnsembleError::corrupt_model(dir, "const_prediction is missing")
                })?;
                EnsembleModel::GradientBoosting(
                    GradientBoostingMSE::from_parts(learning_rate, const_prediction, tree_params, trees)
                        .map_err(|err| EnsembleError::corrupt_model(dir, err.to_string()))?,
                )
            }
        };

        log::info!(
            "Loaded {} with {} trees from {}",
            kind,
            model.n_estimators(),
            dir.display()
        );
        Ok(model)
    }

    /// Loads a stored random forest.
    pub fn load_random_forest<P: AsRef<Path>>(dir: P) -> Result<RandomForestMSE> {
        match Self::load(EnsembleKind::RandomForest, dir)? {
            EnsembleModel::RandomForest(model) => Ok(model),
            EnsembleModel::GradientBoosting(_) => {
                Err(EnsembleError::internal("loaded model has the wrong kind"))
            }
        }
    }

    /// Loads a stored gradient boosting model.
    pub fn load_gradient_boosting<P: AsRef<Path>>(dir: P) -> Result<GradientBoostingMSE> {
        match Self::load(EnsembleKind::GradientBoosting, dir)? {
            EnsembleModel::GradientBoosting(model) => Ok(model),
            EnsembleModel::RandomForest(_) => {
                Err(EnsembleError::internal("loaded model has the wrong kind"))
            }
        }
    }

    fn read_trees(dir: &Path, n_estimators: usize) -> Result<Vec<RegressionTree>> {
        let trees_dir = dir.join(TREES_DIR_NAME);
        if !trees_dir.is_dir() {
            return Err(EnsembleError::corrupt_model(
                dir,
                format!("{}/ directory is missing", TREES_DIR_NAME),
            ));
        }

        let found = Self::tree_artifacts(&trees_dir)?.len();
        if found != n_estimators {
            return Err(EnsembleError::corrupt_model(
                dir,
                format!("expected {} tree artifacts, found {}", n_estimators, found),
            ));
        }

        let mut trees = Vec::with_capacity(n_estimators);
        for index in 0..n_estimators {
            let name = Self::tree_file_name(index);
            let tree = RegressionTree::load_from_file(trees_dir.join(&name))
                .map_err(|err| EnsembleError::corrupt_model(dir, format!("cannot read {}: {}", name, err)))?;
            tree.validate()
                .map_err(|err| EnsembleError::corrupt_model(dir, format!("{} is malformed: {}", name, err)))?;

            if let Some(first) = trees.first().map(RegressionTree::n_features) {
                if tree.n_features() != first {
                    return Err(EnsembleError::corrupt_model(
                        dir,
                        format!("{} expects {} features, tree 0 expects {}", name, tree.n_features(), first),
                    ));
                }
            }
            trees.push(tree);
        }
        Ok(trees)
    }

    fn tree_artifacts(trees_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut artifacts = Vec::new();
        for entry in fs::read_dir(trees_dir)? {
            let path = entry?.path();
            let is_artifact = path
                .file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| name.starts_with(TREE_FILE_PREFIX));
            if is_artifact {
                artifacts.push(path);
            }
        }
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boosting::FitOptions;
    use ndarray::{Array1, Array2};
    use tempfile::TempDir;

    fn fitted_booster() -> (GradientBoostingMSE, Array2<f64>) {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| ((i * 5 + j * 3) % 7) as f64 / 3.0);
        let y = Array1::from_shape_fn(30, |i| 1.0 + x[[i, 0]] * 0.7 + x[[i, 1]]);
        let mut booster =
            GradientBoostingMSE::new(3, 0.1, TreeParams::new().with_max_depth(3).with_random_state(5))
                .unwrap();
        booster.fit(x.view(), y.view(), FitOptions::new()).unwrap();
        (booster, x)
    }

    #[test]
    fn test_tree_file_names() {
        assert_eq!(ModelStore::tree_file_name(0), "tree_0000.bin");
        assert_eq!(ModelStore::tree_file_name(42), "tree_0042.bin");
    }

    #[test]
    fn test_params_file_contents() {
        let (booster, _) = fitted_booster();
        let dir = TempDir::new().unwrap();
        let model_dir = dir.path().join("model");
        ModelStore::dump(&booster, &model_dir).unwrap();

        let params = ModelStore::read_params(&model_dir).unwrap();
        assert_eq!(params.n_estimators, 3);
        assert_eq!(params.kind, Some(EnsembleKind::GradientBoosting));
        assert_eq!(params.learning_rate, Some(0.1));
        assert_eq!(params.const_prediction, booster.const_prediction());
        assert!(model_dir.join("trees").join("tree_0002.bin").is_file());
    }

    #[test]
    fn test_dump_unfitted_fails() {
        let booster = GradientBoostingMSE::new(3, 0.1, TreeParams::default()).unwrap();
        let dir = TempDir::new().unwrap();
        let model_dir = dir.path().join("model");
        assert!(matches!(
            ModelStore::dump(&booster, &model_dir),
            Err(EnsembleError::NotFitted { .. })
        ));
        assert!(!model_dir.exists());
    }

    #[test]
    fn test_kind_mismatch_is_corrupt() {
        let (booster, _) = fitted_booster();
        let dir = TempDir::new().unwrap();
        let model_dir = dir.path().join("model");
        ModelStore::dump(&booster, &model_dir).unwrap();

        assert!(matches!(
            ModelStore::load(EnsembleKind::RandomForest, &model_dir),
            Err(EnsembleError::CorruptModel { .. })
        ));
    }

    #[test]
    fn test_extra_artifact_is_corrupt() {
        let (booster, _) = fitted_booster();
        let dir = TempDir::new().unwrap();
        let model_dir = dir.path().join("model");
        ModelStore::dump(&booster, &model_dir).unwrap();
        fs::copy(
            model_dir.join("trees/tree_0000.bin"),
            model_dir.join("trees/tree_0003.bin"),
        )
        .unwrap();

        assert!(matches!(
            ModelStore::load_gradient_boosting(&model_dir),
            Err(EnsembleError::CorruptModel { .. })
        ));
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ModelStore::load(EnsembleKind::RandomForest, dir.path().join("absent")),
            Err(EnsembleError::NotFound { .. })
        ));
    }

    #[test]
    fn test_legacy_params_without_kind() {
        let (booster, x) = fitted_booster();
        let dir = TempDir::new().unwrap();
        let model_dir = dir.path().join("model");
        ModelStore::dump(&booster, &model_dir).unwrap();

        let legacy = format!(
            r#"{{"n_estimators": 3, "learning_rate": 0.1, "const_prediction": {:?}}}"#,
            booster.const_prediction().unwrap()
        );
        fs::write(model_dir.join(PARAMS_FILE_NAME), legacy).unwrap();

        let loaded = ModelStore::load_gradient_boosting(&model_dir).unwrap();
        assert_eq!(loaded.predict(x.view()).unwrap(), booster.predict(x.view()).unwrap());
    }
}
