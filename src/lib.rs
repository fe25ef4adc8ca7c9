//! # Ensembles Rust
//!
//! Regression tree ensembles trained on squared error:
//!
//! - **Random forest** ([`RandomForestMSE`]): independent CART trees fit on
//!   bootstrap resamples and averaged. Members draw from per-member seeded
//!   streams, so training is reproducible and runs in parallel with Rayon
//!   when no convergence trace is requested.
//! - **Gradient boosting** ([`GradientBoostingMSE`]): trees fit one after
//!   another to the residuals of a running prediction that starts at the
//!   mean target and grows by `learning_rate * tree(x)`.
//!
//! Both can record a per-member [`ConvergenceHistory`] (RMSLE on the
//! training and validation rows), stop early once the monitored loss has
//! not improved for `patience` members, and be written to and read back
//! from a model directory by [`ModelStore`] with bit-identical predictions.
//! [`ExperimentService`] wires these together into named, filesystem-backed
//! experiments.
//!
//! ## Quick Start
//!
//! ```rust
//! use ensembles_rust::{Ensemble, FitOptions, GradientBoostingMSE, TreeParams};
//! use ndarray::{Array1, Array2};
//!
//! # fn main() -> ensembles_rust::Result<()> {
//! let x = Array2::from_shape_fn((60, 2), |(i, j)| ((i * 7 + j * 3) % 11) as f64);
//! let y = Array1::from_shape_fn(60, |i| 5.0 + x[[i, 0]] + 0.5 * x[[i, 1]]);
//! let (x_train, x_val) = x.view().split_at(ndarray::Axis(0), 48);
//! let (y_train, y_val) = y.view().split_at(ndarray::Axis(0), 48);
//!
//! let mut model = GradientBoostingMSE::new(50, 0.1, TreeParams::new().with_max_depth(3))?;
//! let history = model.fit(
//!     x_train,
//!     y_train,
//!     FitOptions::new().with_validation(x_val, y_val).with_patience(5),
//! )?;
//!
//! let history = history.expect("tracing is on when validation data is given");
//! assert_eq!(history.len(), model.n_estimators());
//! let predictions = model.predict(x_val)?;
//! assert_eq!(predictions.len(), 12);
//! # Ok(())
//! # }
//! ```
//!
//! ## Persistence
//!
//! ```rust,no_run
//! use ensembles_rust::{EnsembleKind, ModelStore};
//!
//! # fn example(model: &ensembles_rust::RandomForestMSE) -> ensembles_rust::Result<()> {
//! ModelStore::dump(model, "models/forest")?;
//! let reloaded = ModelStore::load(EnsembleKind::RandomForest, "models/forest")?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    non_snake_case,
    non_upper_case_globals
)]

// Core infrastructure module - always available
pub mod core;

// Configuration management module
pub mod config;

// Regression tree learner
pub mod tree;

// Loss metrics
pub mod metrics;

// Bagging and boosting ensembles
pub mod boosting;

// Model directories
pub mod io;

// CSV data
pub mod dataset;

// Named experiments
pub mod experiment;

// Re-export core functionality for convenience
pub use self::core::{
    constants::*,
    error::{EnsembleError, Result},
    traits::*,
    types::*,
};

pub use config::{ExperimentConfig, ExperimentConfigBuilder, MaxFeatures, ServiceConfig, TreeParams};

pub use boosting::{
    ConvergenceHistory, ConvergenceTracker, EarlyStopper, Ensemble, EnsembleModel, FitOptions,
    GradientBoostingMSE, RandomForestMSE,
};

pub use dataset::{CsvLoader, Dataset, TargetColumn};
pub use experiment::{ExperimentService, LearningCurveSummary};
pub use io::{ModelParams, ModelStore};
pub use metrics::LossPolicy;
pub use tree::RegressionTree;

// Version information
pub use self::core::constants::ENSEMBLES_RUST_VERSION as VERSION;

/// Initialize logging.
///
/// Optional: the library works without it, but nothing is logged unless a
/// `log` backend is installed. Defaults `RUST_LOG` to `info`.
///
/// ```rust
/// fn main() -> ensembles_rust::Result<()> {
///     ensembles_rust::init()?;
///     Ok(())
/// }
/// ```
pub fn init() -> Result<()> {
    core::initialize_core()
}

/// Check if [`init`] has run.
pub fn is_initialized() -> bool {
    core::is_core_initialized()
}
