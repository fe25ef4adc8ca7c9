//! Shared ensemble surface.
//!
//! Both ensemble kinds implement [`Ensemble`]. [`EnsembleModel`] wraps
//! either one for kind-dispatched construction, persistence and loading.

use crate::boosting::bagging::RandomForestMSE;
use crate::boosting::gbdt::GradientBoostingMSE;
use crate::boosting::history::ConvergenceHistory;
use crate::config::core::ExperimentConfig;
use crate::config::tree::TreeParams;
use crate::core::error::{EnsembleError, Result};
use crate::core::types::{EnsembleKind, Feature, Label, Score};
use crate::tree::RegressionTree;
use crate::{ensure, invalid_input};
use ndarray::{Array1, ArrayView1, ArrayView2};

/// Optional arguments to [`Ensemble::fit`].
///
/// `trace` defaults to true exactly when both validation arrays are given.
/// `patience` only takes effect while tracing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitOptions<'a> {
    /// Validation features
    pub x_val: Option<ArrayView2<'a, Feature>>,
    /// Validation targets
    pub y_val: Option<ArrayView1<'a, Label>>,
    /// Record per-member losses
    pub trace: Option<bool>,
    /// Early stopping window
    pub patience: Option<usize>,
}

impl<'a> FitOptions<'a> {
    /// No validation, default tracing, no early stopping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies a validation split.
    pub fn with_validation(mut self, x_val: ArrayView2<'a, Feature>, y_val: ArrayView1<'a, Label>) -> Self {
        self.x_val = Some(x_val);
        self.y_val = Some(y_val);
        self
    }

    /// Forces tracing on or off.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Enables early stopping with the given patience.
    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = Some(patience);
        self
    }

    /// Resolved tracing flag.
    pub fn should_trace(&self) -> bool {
        self.trace
            .unwrap_or(self.x_val.is_some() && self.y_val.is_some())
    }

    /// Validates the validation pair against a training matrix with
    /// `n_features` columns.
    pub fn validation(&self, n_features: usize) -> Result<Option<(ArrayView2<'a, Feature>, ArrayView1<'a, Label>)>> {
        match (self.x_val, self.y_val) {
            (None, None) => Ok(None),
            (Some(_), None) | (None, Some(_)) => Err(EnsembleError::invalid_input(
                "x_val and y_val must be given together",
            )),
            (Some(x_val), Some(y_val)) => {
                if x_val.nrows() != y_val.len() {
                    return Err(EnsembleError::invalid_input(format!(
                        "x_val has {} rows but y_val has {}",
                        x_val.nrows(),
                        y_val.len()
                    )));
                }
                if x_val.nrows() == 0 {
                    return Err(EnsembleError::invalid_input("validation set is empty"));
                }
                if x_val.ncols() != n_features {
                    return Err(EnsembleError::invalid_input(format!(
                        "x_val has {} features but training data has {}",
                        x_val.ncols(),
                        n_features
                    )));
                }
                Ok(Some((x_val, y_val)))
            }
        }
    }
}

/// Checks a training pair before any member is fit.
pub fn validate_training(x: &ArrayView2<'_, Feature>, y: &ArrayView1<'_, Label>) -> Result<()> {
    ensure!(x.nrows() > 0, invalid_input!("training set is empty"));
    ensure!(x.ncols() > 0, invalid_input!("training set has no features"));
    ensure!(
        x.nrows() == y.len(),
        invalid_input!("X has {} rows but y has {}", x.nrows(), y.len())
    );
    Ok(())
}

/// Checks the number of requested members.
pub(crate) fn validate_n_estimators(n_estimators: usize) -> Result<()> {
    if n_estimators == 0 {
        return Err(EnsembleError::invalid_parameter(
            "n_estimators",
            "0",
            "must be at least 1",
        ));
    }
    Ok(())
}

/// Capability shared by every ensemble kind.
pub trait Ensemble: Send + Sync {
    /// Which kind of ensemble this is.
    fn kind(&self) -> EnsembleKind;

    /// Members actually fitted, or the requested cap before fitting.
    fn n_estimators(&self) -> usize;

    /// True once `fit` has succeeded (or the ensemble was loaded).
    fn is_fitted(&self) -> bool;

    /// Hyperparameters applied to every member.
    fn tree_params(&self) -> &TreeParams;

    /// Fitted members in fit order.
    fn trees(&self) -> &[RegressionTree];

    /// Shrinkage applied to each member, for additive ensembles.
    fn learning_rate(&self) -> Option<f64> {
        None
    }

    /// Base value of additive ensembles, once fitted.
    fn const_prediction(&self) -> Option<f64> {
        None
    }

    /// Fits the ensemble, returning the convergence history when tracing.
    fn fit(
        &mut self,
        x: ArrayView2<'_, Feature>,
        y: ArrayView1<'_, Label>,
        options: FitOptions<'_>,
    ) -> Result<Option<ConvergenceHistory>>;

    /// Predicts one value per row of `x`.
    fn predict(&self, x: ArrayView2<'_, Feature>) -> Result<Array1<Score>>;
}

/// Either ensemble kind.
#[derive(Debug, Clone)]
pub enum EnsembleModel {
    /// Bagging over bootstrap resamples
    RandomForest(RandomForestMSE),
    /// Sequential residual boosting
    GradientBoosting(GradientBoostingMSE),
}

impl EnsembleModel {
    /// Creates an unfitted ensemble of the given kind.
    ///
    /// `learning_rate` is ignored for random forests.
    pub fn new(
        kind: EnsembleKind,
        n_estimators: usize,
        learning_rate: f64,
        tree_params: TreeParams,
    ) -> Result<Self> {
        Ok(match kind {
            EnsembleKind::RandomForest => {
                EnsembleModel::RandomForest(RandomForestMSE::new(n_estimators, tree_params)?)
            }
            EnsembleKind::GradientBoosting => EnsembleModel::GradientBoosting(
                GradientBoostingMSE::new(n_estimators, learning_rate, tree_params)?,
            ),
        })
    }

    /// Creates the unfitted ensemble described by an experiment.
    pub fn from_config(config: &ExperimentConfig) -> Result<Self> {
        Self::new(
            config.ml_model,
            config.n_estimators,
            config.learning_rate,
            config.tree_params(),
        )
    }

    /// Borrows the inner ensemble.
    pub fn as_ensemble(&self) -> &dyn Ensemble {
        match self {
            EnsembleModel::RandomForest(model) => model,
            EnsembleModel::GradientBoosting(model) => model,
        }
    }

    /// Mutably borrows the inner ensemble.
    pub fn as_ensemble_mut(&mut self) -> &mut dyn Ensemble {
        match self {
            EnsembleModel::RandomForest(model) => model,
            EnsembleModel::GradientBoosting(model) => model,
        }
    }
}

impl Ensemble for EnsembleModel {
    fn kind(&self) -> EnsembleKind {
        self.as_ensemble().kind()
    }

    fn n_estimators(&self) -> usize {
        self.as_ensemble().n_estimators()
    }

    fn is_fitted(&self) -> bool {
        self.as_ensemble().is_fitted()
    }

    fn tree_params(&self) -> &TreeParams {
        self.as_ensemble().tree_params()
    }

    fn trees(&self) -> &[RegressionTree] {
        self.as_ensemble().trees()
    }

    fn learning_rate(&self) -> Option<f64> {
        self.as_ensemble().learning_rate()
    }

    fn const_prediction(&self) -> Option<f64> {
        self.as_ensemble().const_prediction()
    }

    fn fit(
        &mut self,
        x: ArrayView2<'_, Feature>,
        y: ArrayView1<'_, Label>,
        options: FitOptions<'_>,
    ) -> Result<Option<ConvergenceHistory>> {
        self.as_ensemble_mut().fit(x, y, options)
    }

    fn predict(&self, x: ArrayView2<'_, Feature>) -> Result<Array1<Score>> {
        self.as_ensemble().predict(x)
    }
}

impl From<RandomForestMSE> for EnsembleModel {
    fn from(model: RandomForestMSE) -> Self {
        EnsembleModel::RandomForest(model)
    }
}

impl From<GradientBoostingMSE> for EnsembleModel {
    fn from(model: GradientBoostingMSE) -> Self {
        EnsembleModel::GradientBoosting(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_trace_default() {
        let x = Array2::<f64>::zeros((2, 1));
        let y = array![1.0, 2.0];

        assert!(!FitOptions::new().should_trace());
        assert!(FitOptions::new().with_trace(true).should_trace());
        assert!(FitOptions::new()
            .with_validation(x.view(), y.view())
            .should_trace());
        assert!(!FitOptions::new()
            .with_validation(x.view(), y.view())
            .with_trace(false)
            .should_trace());
    }

    #[test]
    fn test_validation_pair_checks() {
        let x = Array2::<f64>::zeros((3, 2));
        let y = array![1.0, 2.0, 3.0];
        let short = array![1.0];

        let half = FitOptions {
            x_val: Some(x.view()),
            ..FitOptions::default()
        };
        assert!(matches!(half.validation(2), Err(EnsembleError::InvalidInput { .. })));

        let mismatched = FitOptions::new().with_validation(x.view(), short.view());
        assert!(mismatched.validation(2).is_err());

        let wrong_width = FitOptions::new().with_validation(x.view(), y.view());
        assert!(wrong_width.validation(5).is_err());

        let ok = FitOptions::new().with_validation(x.view(), y.view());
        assert!(ok.validation(2).unwrap().is_some());
        assert!(FitOptions::new().validation(2).unwrap().is_none());
    }

    #[test]
    fn test_validate_training() {
        let x = Array2::<f64>::zeros((3, 2));
        assert!(validate_training(&x.view(), &array![1.0, 2.0, 3.0].view()).is_ok());
        assert!(validate_training(&x.view(), &array![1.0].view()).is_err());

        let empty = Array2::<f64>::zeros((0, 2));
        assert!(validate_training(&empty.view(), &Array1::<f64>::zeros(0).view()).is_err());
    }

    #[test]
    fn test_model_from_config() {
        let config = ExperimentConfig::new("demo", EnsembleKind::GradientBoosting);
        let model = EnsembleModel::from_config(&config).unwrap();
        assert_eq!(model.kind(), EnsembleKind::GradientBoosting);
        assert_eq!(model.n_estimators(), config.n_estimators);
        assert_eq!(model.learning_rate(), Some(config.learning_rate));
        assert!(!model.is_fitted());

        assert!(EnsembleModel::new(EnsembleKind::RandomForest, 0, 0.1, TreeParams::default()).is_err());
    }
}
