//! Tabular regression data.
//!
//! A [`Dataset`] is a dense `f64` feature matrix with column names and an
//! optional target vector, usually loaded from headered CSV by
//! [`CsvLoader`].

pub mod loader;

pub use loader::{CsvLoader, TargetColumn};

use crate::core::error::{EnsembleError, Result};
use crate::core::types::{Feature, Label};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};

/// Dense feature matrix with an optional named target.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    feature_names: Vec<String>,
    features: Array2<Feature>,
    target: Option<(String, Array1<Label>)>,
}

impl Dataset {
    /// Builds a dataset, checking that names and rows line up.
    pub fn new(
        feature_names: Vec<String>,
        features: Array2<Feature>,
        target: Option<(String, Array1<Label>)>,
    ) -> Result<Self> {
        if feature_names.len() != features.ncols() {
            return Err(EnsembleError::invalid_input(format!(
                "{} feature names for {} columns",
                feature_names.len(),
                features.ncols()
            )));
        }
        if let Some((name, values)) = &target {
            if values.len() != features.nrows() {
                return Err(EnsembleError::invalid_input(format!(
                    "target '{}' has {} values for {} rows",
                    name,
                    values.len(),
                    features.nrows()
                )));
            }
        }

        Ok(Dataset {
            feature_names,
            features,
            target,
        })
    }

    /// Number of rows
    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    /// Number of feature columns
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Feature column names, in matrix order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Feature matrix
    pub fn features(&self) -> ArrayView2<'_, Feature> {
        self.features.view()
    }

    /// Target values, if the dataset has a target
    pub fn target(&self) -> Option<ArrayView1<'_, Label>> {
        self.target.as_ref().map(|(_, values)| values.view())
    }

    /// Target column name, if the dataset has a target
    pub fn target_name(&self) -> Option<&str> {
        self.target.as_ref().map(|(name, _)| name.as_str())
    }

    /// Splits rows in order: the first `n_rows` and the rest.
    pub fn split_at(&self, n_rows: usize) -> Result<(Dataset, Dataset)> {
        if n_rows > self.n_rows() {
            return Err(EnsembleError::invalid_input(format!(
                "cannot take {} rows from a dataset of {}",
                n_rows,
                self.n_rows()
            )));
        }

        let head = self.slice_rows(0, n_rows);
        let tail = self.slice_rows(n_rows, self.n_rows());
        Ok((head, tail))
    }

    /// Splits rows in order, keeping `floor(fraction * n_rows)` in the head.
    pub fn split_fraction(&self, fraction: f64) -> Result<(Dataset, Dataset)> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(EnsembleError::invalid_parameter(
                "train_fraction",
                fraction.to_string(),
                "must be in range (0.0, 1.0]",
            ));
        }
        let n_head = (fraction * self.n_rows() as f64).floor() as usize;
        self.split_at(n_head.min(self.n_rows()))
    }

    fn slice_rows(&self, start: usize, end: usize) -> Dataset {
        Dataset {
            feature_names: self.feature_names.clone(),
            features: self.features.slice(s![start..end, ..]).to_owned(),
            target: self
                .target
                .as_ref()
                .map(|(name, values)| (name.clone(), values.slice(s![start..end]).to_owned())),
        }
    }
}
