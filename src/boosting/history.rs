//! Per-member loss bookkeeping.

use crate::boosting::early_stopping::best_iteration;
use crate::core::error::{EnsembleError, Result};
use crate::core::types::{IterationIndex, Label, Score};
use crate::metrics::regression::{root_mean_squared_log_error, LossPolicy};
use ndarray::ArrayView1;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Training and validation loss recorded after every fitted member.
///
/// `val` is present exactly when a validation split was supplied, and then
/// always has the same length as `train`. Non-finite losses are stored as
/// JSON `null` and read back as NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceHistory {
    #[serde(serialize_with = "serialize_losses", deserialize_with = "deserialize_losses")]
    train: Vec<f64>,
    #[serde(
        serialize_with = "serialize_optional_losses",
        deserialize_with = "deserialize_optional_losses",
        default
    )]
    val: Option<Vec<f64>>,
}

impl ConvergenceHistory {
    /// Creates an empty history, with a validation series if requested.
    pub fn new(with_validation: bool) -> Self {
        ConvergenceHistory {
            train: Vec::new(),
            val: with_validation.then(Vec::new),
        }
    }

    /// Appends the losses of one member.
    ///
    /// A validation loss is ignored when the history has no validation
    /// series, and a missing one is recorded as NaN when it has one, so both
    /// series always stay aligned.
    pub fn push(&mut self, train_loss: f64, val_loss: Option<f64>) {
        self.train.push(train_loss);
        if let Some(val) = self.val.as_mut() {
            val.push(val_loss.unwrap_or(f64::NAN));
        }
    }

    /// Training losses in fit order.
    pub fn train(&self) -> &[f64] {
        &self.train
    }

    /// Validation losses in fit order, if a validation split was used.
    pub fn val(&self) -> Option<&[f64]> {
        self.val.as_deref()
    }

    /// Series used for early stopping: validation when present.
    pub fn monitored(&self) -> &[f64] {
        self.val().unwrap_or(&self.train[..])
    }

    /// Number of recorded members.
    pub fn len(&self) -> usize {
        self.train.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.train.is_empty()
    }

    /// Index of the best monitored loss.
    pub fn best_iteration(&self) -> Option<IterationIndex> {
        best_iteration(self.monitored())
    }

    /// Lowest training loss, ignoring NaN.
    pub fn best_train(&self) -> Option<f64> {
        best_iteration(&self.train).map(|i| self.train[i])
    }

    /// Lowest validation loss, ignoring NaN.
    pub fn best_val(&self) -> Option<f64> {
        let val = self.val()?;
        best_iteration(val).map(|i| val[i])
    }

    /// Drops every entry past the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.train.truncate(len);
        if let Some(val) = self.val.as_mut() {
            val.truncate(len);
        }
    }
}

/// Scores ensemble prefixes and appends the losses to a history.
#[derive(Debug, Clone)]
pub struct ConvergenceTracker {
    history: ConvergenceHistory,
    policy: LossPolicy,
}

impl ConvergenceTracker {
    /// Creates a tracker, with a validation series if requested.
    pub fn new(with_validation: bool, policy: LossPolicy) -> Self {
        ConvergenceTracker {
            history: ConvergenceHistory::new(with_validation),
            policy,
        }
    }

    /// Records the losses of the current ensemble prefix.
    ///
    /// `validation` must be given exactly when the tracker was created with a
    /// validation series.
    pub fn record(
        &mut self,
        train_targets: ArrayView1<'_, Label>,
        train_predictions: ArrayView1<'_, Score>,
        validation: Option<(ArrayView1<'_, Label>, ArrayView1<'_, Score>)>,
    ) -> Result<()> {
        if validation.is_some() != self.history.val.is_some() {
            return Err(EnsembleError::internal(
                "validation losses must be recorded exactly when tracking validation",
            ));
        }

        let train_loss = root_mean_squared_log_error(&train_targets, &train_predictions, self.policy)?;
        let val_loss = validation
            .map(|(targets, predictions)| {
                root_mean_squared_log_error(&targets, &predictions, self.policy)
            })
            .transpose()?;

        log::debug!(
            "member {}: train loss {:.6}{}",
            self.history.len(),
            train_loss,
            val_loss
                .map(|v| format!(", validation loss {:.6}", v))
                .unwrap_or_default()
        );

        self.history.push(train_loss, val_loss);
        Ok(())
    }

    /// Loss policy applied to every record.
    pub fn policy(&self) -> LossPolicy {
        self.policy
    }

    /// History recorded so far.
    pub fn history(&self) -> &ConvergenceHistory {
        &self.history
    }

    /// Consumes the tracker, returning its history.
    pub fn into_history(self) -> ConvergenceHistory {
        self.history
    }
}

fn serialize_losses<S: Serializer>(losses: &[f64], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(losses.iter().map(|&v| v.is_finite().then_some(v)))
}

fn deserialize_losses<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<f64>, D::Error> {
    let raw = Vec::<Option<f64>>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

fn serialize_optional_losses<S: Serializer>(
    losses: &Option<Vec<f64>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match losses {
        Some(losses) => serialize_losses(losses, serializer),
        None => serializer.serialize_none(),
    }
}

fn deserialize_optional_losses<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<Vec<f64>>, D::Error> {
    let raw = Option::<Vec<Option<f64>>>::deserialize(deserializer)?;
    Ok(raw.map(|losses| losses.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()))
}
