//! Tree ensembles.
//!
//! - [`RandomForestMSE`]: independent trees on bootstrap resamples, averaged
//! - [`GradientBoostingMSE`]: trees fit sequentially to residuals, summed
//!   with a learning rate on top of the mean target
//!
//! Both record per-member losses through a [`ConvergenceTracker`] and stop
//! early through an [`EarlyStopper`].

pub mod bagging;
pub mod early_stopping;
pub mod ensemble;
pub mod gbdt;
pub mod history;
pub mod sample_strategy;

pub use bagging::RandomForestMSE;
pub use early_stopping::EarlyStopper;
pub use ensemble::{Ensemble, EnsembleModel, FitOptions};
pub use gbdt::GradientBoostingMSE;
pub use history::{ConvergenceHistory, ConvergenceTracker};
