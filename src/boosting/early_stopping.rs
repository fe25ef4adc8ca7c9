//! Patience-based early stopping over a convergence history.

use crate::boosting::history::ConvergenceHistory;
use crate::core::types::IterationIndex;

/// Decides when an ensemble should stop adding members.
///
/// The monitored series is the validation loss when present, otherwise the
/// training loss. Growth halts once the last `patience + 1` entries all came
/// after the best (lowest) entry. Only a strictly lower value counts as an
/// improvement, and NaN never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EarlyStopper {
    patience: usize,
}

impl EarlyStopper {
    /// Creates a stopper with the given patience window.
    pub fn new(patience: usize) -> Self {
        EarlyStopper { patience }
    }

    /// Patience window.
    pub fn patience(&self) -> usize {
        self.patience
    }

    /// Returns true when the monitored series of `history` has stalled.
    pub fn should_stop(&self, history: &ConvergenceHistory) -> bool {
        has_stalled(history.monitored(), self.patience)
    }
}

/// Index of the first occurrence of the minimum, ignoring NaN.
pub fn best_iteration(series: &[f64]) -> Option<IterationIndex> {
    let mut best: Option<(IterationIndex, f64)> = None;
    for (i, &value) in series.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, best_value)) if value >= best_value => {}
            _ => best = Some((i, value)),
        }
    }
    best.map(|(i, _)| i)
}

/// True once more than `patience` entries follow the best entry.
///
/// A series with no comparable entry (empty or all NaN) counts every entry
/// as non-improving.
pub fn has_stalled(series: &[f64], patience: usize) -> bool {
    if series.len() < patience + 1 {
        return false;
    }
    let since_best = match best_iteration(series) {
        Some(best) => series.len() - 1 - best,
        None => series.len(),
    };
    since_best > patience
}
