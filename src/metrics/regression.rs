//! Regression losses used for convergence tracking and reporting.

use crate::core::error::{EnsembleError, Result};
use crate::core::types::{Label, Score};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// How RMSLE treats values outside its domain.
///
/// `log1p` is undefined below -1 and RMSLE is only meaningful for
/// non-negative inputs. Boosted predictions are not constrained to stay
/// non-negative, so the caller picks the behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossPolicy {
    /// Compute on the raw values; out-of-domain inputs yield NaN
    #[default]
    Propagate,
    /// Clamp predictions and targets at zero before taking `log1p`
    ClampNegative,
}

fn validate_inputs(targets: &ArrayView1<'_, Label>, predictions: &ArrayView1<'_, Score>) -> Result<()> {
    if targets.len() != predictions.len() {
        return Err(EnsembleError::invalid_input(format!(
            "targets have {} values but predictions have {}",
            targets.len(),
            predictions.len()
        )));
    }
    if targets.is_empty() {
        return Err(EnsembleError::invalid_input("cannot compute a loss on zero rows"));
    }
    Ok(())
}

/// Root mean squared logarithmic error:
/// `sqrt(mean((log1p(y) - log1p(y_hat))^2))`.
pub fn root_mean_squared_log_error(
    targets: &ArrayView1<'_, Label>,
    predictions: &ArrayView1<'_, Score>,
    policy: LossPolicy,
) -> Result<f64> {
    validate_inputs(targets, predictions)?;

    let negatives = targets
        .iter()
        .chain(predictions.iter())
        .filter(|&&v| v < 0.0)
        .count();

    let prepare = |v: f64| match policy {
        LossPolicy::Propagate => v,
        LossPolicy::ClampNegative => v.max(0.0),
    };

    if negatives > 0 {
        match policy {
            LossPolicy::Propagate => log::warn!(
                "RMSLE received {} negative values; the loss may be NaN",
                negatives
            ),
            LossPolicy::ClampNegative => log::debug!(
                "RMSLE clamped {} negative values to zero",
                negatives
            ),
        }
    }

    let sum: f64 = targets
        .iter()
        .zip(predictions.iter())
        .map(|(&y, &p)| (prepare(y).ln_1p() - prepare(p).ln_1p()).powi(2))
        .sum();

    Ok((sum / targets.len() as f64).sqrt())
}

/// Mean squared error.
pub fn mean_squared_error(
    targets: &ArrayView1<'_, Label>,
    predictions: &ArrayView1<'_, Score>,
) -> Result<f64> {
    validate_inputs(targets, predictions)?;

    let sum: f64 = targets
        .iter()
        .zip(predictions.iter())
        .map(|(&y, &p)| (y - p).powi(2))
        .sum();

    Ok(sum / targets.len() as f64)
}

/// Root mean squared error.
pub fn root_mean_squared_error(
    targets: &ArrayView1<'_, Label>,
    predictions: &ArrayView1<'_, Score>,
) -> Result<f64> {
    Ok(mean_squared_error(targets, predictions)?.sqrt())
}
