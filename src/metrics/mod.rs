//! Evaluation metrics.
//!
//! Convergence tracking scores every ensemble prefix with
//! [`root_mean_squared_log_error`]; the squared-error helpers are used for
//! reporting.
//!
//! ```rust
//! use ensembles_rust::metrics::{root_mean_squared_log_error, LossPolicy};
//! use ndarray::array;
//!
//! # fn example() -> ensembles_rust::Result<()> {
//! let targets = array![1.0, 2.0, 3.0];
//! let predictions = array![1.1, 1.9, 3.2];
//! let loss = root_mean_squared_log_error(&targets.view(), &predictions.view(), LossPolicy::Propagate)?;
//! assert!(loss > 0.0);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod regression;

pub use regression::{
    mean_squared_error, root_mean_squared_error, root_mean_squared_log_error, LossPolicy,
};
