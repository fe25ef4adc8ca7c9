//! Gradient boosting on squared error.

use crate::boosting::early_stopping::EarlyStopper;
use crate::boosting::ensemble::{validate_n_estimators, validate_training, Ensemble, FitOptions};
use crate::boosting::history::{ConvergenceHistory, ConvergenceTracker};
use crate::boosting::sample_strategy::{derive_seed, resolve_base_seed, TREE_STREAM};
use crate::config::tree::TreeParams;
use crate::core::error::{EnsembleError, Result};
use crate::core::types::{EnsembleKind, Feature, Label, Score};
use crate::metrics::regression::LossPolicy;
use crate::tree::RegressionTree;
use ndarray::{azip, Array1, ArrayView1, ArrayView2};

/// Fits trees sequentially to the residuals of a running prediction.
///
/// The prediction is `const_prediction + learning_rate * sum(tree(x))`,
/// where `const_prediction` is the mean training target. Member `i` is fit
/// on the residuals left by members `0..i`, so members are strictly
/// sequential.
#[derive(Debug, Clone)]
pub struct GradientBoostingMSE {
    max_estimators: usize,
    learning_rate: f64,
    tree_params: TreeParams,
    loss_policy: LossPolicy,
    const_prediction: Option<f64>,
    trees: Vec<RegressionTree>,
    early_stopped: bool,
}

/// `prediction += learning_rate * contribution`, element by element.
fn add_scaled(prediction: &mut Array1<Score>, contribution: &Array1<Score>, learning_rate: f64) {
    azip!((p in prediction, &c in contribution) *p += learning_rate * c);
}

impl GradientBoostingMSE {
    /// Creates an unfitted booster of at most `n_estimators` trees.
    pub fn new(n_estimators: usize, learning_rate: f64, tree_params: TreeParams) -> Result<Self> {
        validate_n_estimators(n_estimators)?;
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(EnsembleError::invalid_parameter(
                "learning_rate",
                learning_rate.to_string(),
                "must be a positive finite number",
            ));
        }
        tree_params.validate()?;

        Ok(GradientBoostingMSE {
            max_estimators: n_estimators,
            learning_rate,
            tree_params,
            loss_policy: LossPolicy::default(),
            const_prediction: None,
            trees: Vec::new(),
            early_stopped: false,
        })
    }

    /// Rebuilds a fitted booster from stored scalars and members.
    pub fn from_parts(
        learning_rate: f64,
        const_prediction: f64,
        tree_params: TreeParams,
        trees: Vec<RegressionTree>,
    ) -> Result<Self> {
        if !const_prediction.is_finite() {
            return Err(EnsembleError::invalid_parameter(
                "const_prediction",
                const_prediction.to_string(),
                "must be finite",
            ));
        }
        let mut booster = Self::new(trees.len(), learning_rate, tree_params)?;
        booster.const_prediction = Some(const_prediction);
        booster.trees = trees;
        Ok(booster)
    }

    /// Sets how convergence tracking handles negative values.
    pub fn with_loss_policy(mut self, policy: LossPolicy) -> Self {
        self.loss_policy = policy;
        self
    }

    /// Whether the last fit ended through early stopping.
    pub fn early_stopped(&self) -> bool {
        self.early_stopped
    }
}

impl Ensemble for GradientBoostingMSE {
    fn kind(&self) -> EnsembleKind {
        EnsembleKind::GradientBoosting
    }

    fn n_estimators(&self) -> usize {
        if self.is_fitted() {
            self.trees.len()
        } else {
            self.max_estimators
        }
    }

    fn is_fitted(&self) -> bool {
        self.const_prediction.is_some()
    }

    fn tree_params(&self) -> &TreeParams {
        &self.tree_params
    }

    fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    fn learning_rate(&self) -> Option<f64> {
        Some(self.learning_rate)
    }

    fn const_prediction(&self) -> Option<f64> {
        self.const_prediction
    }

    fn fit(
        &mut self,
        x: ArrayView2<'_, Feature>,
        y: ArrayView1<'_, Label>,
        options: FitOptions<'_>,
    ) -> Result<Option<ConvergenceHistory>> {
        validate_training(&x, &y)?;
        let validation = options.validation(x.ncols())?;
        let trace = options.should_trace();
        let base_seed = resolve_base_seed(self.tree_params.random_state);

        self.trees.clear();
        self.const_prediction = None;
        self.early_stopped = false;

        log::info!(
            "Fitting gradient boosting: {} trees (learning rate {}) on {} rows x {} features (trace: {}, patience: {:?})",
            self.max_estimators,
            self.learning_rate,
            x.nrows(),
            x.ncols(),
            trace,
            options.patience
        );
        if !trace && options.patience.is_some() {
            log::warn!("patience is ignored when tracing is disabled");
        }

        let const_prediction = y.sum() / y.len() as f64;
        let mut train_pred = Array1::from_elem(x.nrows(), const_prediction);
        let mut val_pred = validation
            .filter(|_| trace)
            .map(|(x_val, _)| Array1::from_elem(x_val.nrows(), const_prediction));

        let mut tracker = trace.then(|| ConvergenceTracker::new(validation.is_some(), self.loss_policy));
        let stopper = options.patience.filter(|_| trace).map(EarlyStopper::new);
        let mut trees = Vec::with_capacity(self.max_estimators);
        let mut stopped = false;

        for member in 0..self.max_estimators {
            let residuals = &y - &train_pred;
            let params = TreeParams {
                random_state: Some(derive_seed(base_seed, member, TREE_STREAM)),
                ..self.tree_params.clone()
            };
            let tree = RegressionTree::fit(x, residuals.view(), &params)?;

            add_scaled(&mut train_pred, &tree.predict(x)?, self.learning_rate);
            if let (Some(pred), Some((x_val, _))) = (val_pred.as_mut(), validation) {
                add_scaled(pred, &tree.predict(x_val)?, self.learning_rate);
            }
            trees.push(tree);

            let Some(tracker) = tracker.as_mut() else {
                continue;
            };
            tracker.record(
                y,
                train_pred.view(),
                validation
                    .zip(val_pred.as_ref())
                    .map(|((_, y_val), pred)| (y_val, pred.view())),
            )?;

            if let Some(stopper) = stopper {
                if stopper.should_stop(tracker.history()) {
                    log::info!(
                        "Early stopping gradient boosting after {} of {} trees (best at {:?})",
                        trees.len(),
                        self.max_estimators,
                        tracker.history().best_iteration()
                    );
                    stopped = true;
                    break;
                }
            }
        }

        self.trees = trees;
        self.const_prediction = Some(const_prediction);
        self.early_stopped = stopped;
        Ok(tracker.map(ConvergenceTracker::into_history))
    }

    fn predict(&self, x: ArrayView2<'_, Feature>) -> Result<Array1<Score>> {
        let const_prediction = self
            .const_prediction
            .ok_or_else(|| EnsembleError::not_fitted("predict"))?;

        let mut prediction = Array1::from_elem(x.nrows(), const_prediction);
        for tree in &self.trees {
            add_scaled(&mut prediction, &tree.predict(x)?, self.learning_rate);
        }
        Ok(prediction)
    }
}
