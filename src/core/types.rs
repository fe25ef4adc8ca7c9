//! Core data types shared across the crate.

use crate::core::error::EnsembleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Feature matrix element type.
pub type Feature = f64;

/// Prediction value type.
pub type Score = f64;

/// Regression target type.
pub type Label = f64;

/// Feature (column) index type.
pub type FeatureIndex = usize;

/// Tree node identifier type.
pub type NodeIndex = usize;

/// Ensemble member position, in fit order.
pub type IterationIndex = usize;

/// The two supported ensemble families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnsembleKind {
    /// Independent trees over bootstrap resamples, averaged
    #[serde(rename = "Random Forest")]
    RandomForest,
    /// Sequential trees over residuals, summed with shrinkage
    #[serde(rename = "Gradient Boosting")]
    GradientBoosting,
}

impl EnsembleKind {
    /// Human-readable name, as used in experiment configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            EnsembleKind::RandomForest => "Random Forest",
            EnsembleKind::GradientBoosting => "Gradient Boosting",
        }
    }
}

impl Default for EnsembleKind {
    fn default() -> Self {
        EnsembleKind::RandomForest
    }
}

impl fmt::Display for EnsembleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnsembleKind {
    type Err = EnsembleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "random forest" | "random_forest" | "rf" | "bagging" => Ok(EnsembleKind::RandomForest),
            "gradient boosting" | "gradient_boosting" | "gbdt" | "boosting" => {
                Ok(EnsembleKind::GradientBoosting)
            }
            _ => Err(EnsembleError::invalid_parameter(
                "ml_model",
                s,
                "expected 'Random Forest' or 'Gradient Boosting'",
            )),
        }
    }
}
