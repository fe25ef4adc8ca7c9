//! Random-forest style bagging ensemble.

use crate::boosting::early_stopping::EarlyStopper;
use crate::boosting::ensemble::{validate_n_estimators, validate_training, Ensemble, FitOptions};
use crate::boosting::history::{ConvergenceHistory, ConvergenceTracker};
use crate::boosting::sample_strategy::{
    bootstrap_indices, derive_seed, resolve_base_seed, BOOTSTRAP_STREAM, TREE_STREAM,
};
use crate::config::tree::TreeParams;
use crate::core::error::{EnsembleError, Result};
use crate::core::types::{EnsembleKind, Feature, IterationIndex, Label, Score};
use crate::metrics::regression::LossPolicy;
use crate::tree::RegressionTree;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

/// Averages independent trees fit on bootstrap resamples.
///
/// Member `i` draws its bootstrap sample and its split-level feature
/// sampling from streams derived from the ensemble seed and `i`, so a fixed
/// `random_state` reproduces the same members whether they are fit one
/// after another or in parallel.
#[derive(Debug, Clone)]
pub struct RandomForestMSE {
    max_estimators: usize,
    tree_params: TreeParams,
    loss_policy: LossPolicy,
    trees: Vec<RegressionTree>,
    early_stopped: bool,
}

impl RandomForestMSE {
    /// Creates an unfitted forest of at most `n_estimators` trees.
    pub fn new(n_estimators: usize, tree_params: TreeParams) -> Result<Self> {
        validate_n_estimators(n_estimators)?;
        tree_params.validate()?;

        Ok(RandomForestMSE {
            max_estimators: n_estimators,
            tree_params,
            loss_policy: LossPolicy::default(),
            trees: Vec::new(),
            early_stopped: false,
        })
    }

    /// Rebuilds a fitted forest from stored members.
    pub fn from_trees(tree_params: TreeParams, trees: Vec<RegressionTree>) -> Result<Self> {
        let mut forest = Self::new(trees.len(), tree_params)?;
        forest.trees = trees;
        Ok(forest)
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

    fn fit_parallel(
        &self,
        x: ArrayView2<'_, Feature>,
        y: ArrayView1<'_, Label>,
        base_seed: u64,
    ) -> Result<Vec<RegressionTree>> {
        (0..self.max_estimators)
            .into_par_iter()
            .map(|member| fit_member(x, y, &self.tree_params, base_seed, member))
            .collect()
    }

    fn fit_traced(
        &self,
        x: ArrayView2<'_, Feature>,
        y: ArrayView1<'_, Label>,
        validation: Option<(ArrayView2<'_, Feature>, ArrayView1<'_, Label>)>,
        patience: Option<usize>,
        base_seed: u64,
    ) -> Result<(Vec<RegressionTree>, ConvergenceHistory, bool)> {
        let mut tracker = ConvergenceTracker::new(validation.is_some(), self.loss_policy);
        let stopper = patience.map(EarlyStopper::new);
        let mut trees = Vec::with_capacity(self.max_estimators);

        let mut train_sum = Array1::<Score>::zeros(x.nrows());
        let mut val_sum = validation.map(|(x_val, _)| Array1::<Score>::zeros(x_val.nrows()));

        for member in 0..self.max_estimators {
            let tree = fit_member(x, y, &self.tree_params, base_seed, member)?;

            train_sum += &tree.predict(x)?;
            if let (Some(sum), Some((x_val, _))) = (val_sum.as_mut(), validation) {
                *sum += &tree.predict(x_val)?;
            }
            trees.push(tree);

            let count = trees.len() as f64;
            let train_pred = &train_sum / count;
            let val_pred = val_sum.as_ref().map(|sum| sum / count);

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
                        "Early stopping random forest after {} of {} trees (best at {:?})",
                        trees.len(),
                        self.max_estimators,
                        tracker.history().best_iteration()
                    );
                    return Ok((trees, tracker.into_history(), true));
                }
            }
        }

        Ok((trees, tracker.into_history(), false))
    }
}

/// Fits member `member` on its own bootstrap resample.
fn fit_member(
    x: ArrayView2<'_, Feature>,
    y: ArrayView1<'_, Label>,
    tree_params: &TreeParams,
    base_seed: u64,
    member: IterationIndex,
) -> Result<RegressionTree> {
    let rows = bootstrap_indices(x.nrows(), derive_seed(base_seed, member, BOOTSTRAP_STREAM));
    let x_boot = x.select(Axis(0), &rows);
    let y_boot = y.select(Axis(0), &rows);

    let params = TreeParams {
        random_state: Some(derive_seed(base_seed, member, TREE_STREAM)),
        ..tree_params.clone()
    };
    RegressionTree::fit(x_boot.view(), y_boot.view(), &params)
}

impl Ensemble for RandomForestMSE {
    fn kind(&self) -> EnsembleKind {
        EnsembleKind::RandomForest
    }

    fn n_estimators(&self) -> usize {
        if self.is_fitted() {
            self.trees.len()
        } else {
            self.max_estimators
        }
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn tree_params(&self) -> &TreeParams {
        &self.tree_params
    }

    fn trees(&self) -> &[RegressionTree] {
        &self.trees
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
        self.early_stopped = false;

        log::info!(
            "Fitting random forest: {} trees on {} rows x {} features (trace: {}, patience: {:?})",
            self.max_estimators,
            x.nrows(),
            x.ncols(),
            trace,
            options.patience
        );

        if !trace {
            if options.patience.is_some() {
                log::warn!("patience is ignored when tracing is disabled");
            }
            self.trees = self.fit_parallel(x, y, base_seed)?;
            return Ok(None);
        }

        let (trees, history, stopped) =
            self.fit_traced(x, y, validation, options.patience, base_seed)?;
        self.trees = trees;
        self.early_stopped = stopped;
        Ok(Some(history))
    }

    fn predict(&self, x: ArrayView2<'_, Feature>) -> Result<Array1<Score>> {
        if !self.is_fitted() {
            return Err(EnsembleError::not_fitted("predict"));
        }

        let mut sum = Array1::<Score>::zeros(x.nrows());
        for tree in &self.trees {
            sum += &tree.predict(x)?;
        }
        Ok(sum / self.trees.len() as f64)
    }
}
