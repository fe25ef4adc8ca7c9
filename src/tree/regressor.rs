//! Single regression tree minimizing squared error.

use crate::config::tree::TreeParams;
use crate::core::error::{EnsembleError, Result};
use crate::core::traits::Persistable;
use crate::core::types::{Feature, Label, NodeIndex, Score};
use crate::tree::node::TreeNode;
use crate::tree::sampling::FeatureSampler;
use crate::tree::split::find_best_split;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A fitted CART regression tree.
///
/// Immutable once fit: ensembles only append or drop whole trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
    n_features: usize,
    depth: usize,
}

impl Persistable for RegressionTree {}

struct PendingNode {
    slot: NodeIndex,
    rows: Vec<usize>,
    depth: usize,
}

impl RegressionTree {
    /// Fits a tree on `(features, targets)`.
    ///
    /// Nodes are split greedily until `max_depth` is reached, a node has
    /// fewer than `min_samples_split` rows, its targets are constant, or no
    /// split leaves `min_samples_leaf` rows on both sides. The split search
    /// at every node only looks at the features drawn by the
    /// `max_features` policy, seeded from `random_state` (or from entropy
    /// when unset).
    pub fn fit(
        features: ArrayView2<'_, Feature>,
        targets: ArrayView1<'_, Label>,
        params: &TreeParams,
    ) -> Result<Self> {
        params.validate()?;
        let (n_rows, n_features) = features.dim();

        if n_rows == 0 {
            return Err(EnsembleError::invalid_input("cannot fit a tree on zero rows"));
        }
        if targets.len() != n_rows {
            return Err(EnsembleError::invalid_input(format!(
                "features have {} rows but targets have {}",
                n_rows,
                targets.len()
            )));
        }
        if features.iter().any(|v| !v.is_finite()) || targets.iter().any(|v| !v.is_finite()) {
            return Err(EnsembleError::invalid_input(
                "features and targets must be finite",
            ));
        }

        let seed = params
            .random_state
            .unwrap_or_else(|| rand::thread_rng().gen());
        let mut sampler = FeatureSampler::new(n_features, &params.max_features, seed)?;

        let mut nodes = vec![placeholder()];
        let mut depth = 0;
        let mut pending = vec![PendingNode {
            slot: 0,
            rows: (0..n_rows).collect(),
            depth: 0,
        }];

        while let Some(PendingNode { slot, rows, depth: node_depth }) = pending.pop() {
            depth = depth.max(node_depth);

            let split = if can_split(&features, &targets, &rows, node_depth, params) {
                let candidates = sampler.sample();
                find_best_split(&features, &targets, &rows, candidates, params.min_samples_leaf)
            } else {
                None
            };

            let Some(split) = split else {
                nodes[slot] = TreeNode::Leaf {
                    value: mean(&targets, &rows),
                    n_samples: rows.len(),
                };
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .iter()
                .partition(|&&r| features[[r, split.feature]] <= split.threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(placeholder());
            nodes.push(placeholder());

            nodes[slot] = TreeNode::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
                gain: split.gain,
                n_samples: rows.len(),
            };

            pending.push(PendingNode {
                slot: right,
                rows: right_rows,
                depth: node_depth + 1,
            });
            pending.push(PendingNode {
                slot: left,
                rows: left_rows,
                depth: node_depth + 1,
            });
        }

        Ok(RegressionTree {
            nodes,
            n_features,
            depth,
        })
    }

    /// Predicts one value per row of `features`.
    pub fn predict(&self, features: ArrayView2<'_, Feature>) -> Result<Array1<Score>> {
        if features.ncols() != self.n_features {
            return Err(EnsembleError::invalid_input(format!(
                "tree was fit on {} features, got {}",
                self.n_features,
                features.ncols()
            )));
        }

        let predictions: Vec<Score> = features
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|row| self.predict_row(row))
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    /// Predicts a single row.
    pub fn predict_row(&self, row: ArrayView1<'_, Feature>) -> Score {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Flat node storage, root first.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Number of features the tree was fit on.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Depth of the deepest leaf (a lone root leaf has depth 0).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of leaves.
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// Checks that the node layout can be walked by [`predict_row`].
    ///
    /// A fitted tree always passes. Trees decoded from artifacts may not:
    /// the node list must be non-empty, every split must test a feature
    /// below `n_features`, and its children must come after it in the node
    /// list, so every walk from the root ends at a leaf.
    ///
    /// [`predict_row`]: RegressionTree::predict_row
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(EnsembleError::invalid_input("tree has no nodes"));
        }

        for (index, node) in self.nodes.iter().enumerate() {
            let TreeNode::Split {
                feature, left, right, ..
            } = node
            else {
                continue;
            };

            if *feature >= self.n_features {
                return Err(EnsembleError::invalid_input(format!(
                    "node {} tests feature {} of {}",
                    index, feature, self.n_features
                )));
            }
            for child in [*left, *right] {
                if child <= index || child >= self.nodes.len() {
                    return Err(EnsembleError::invalid_input(format!(
                        "node {} points at child {} of {} nodes",
                        index,
                        child,
                        self.nodes.len()
                    )));
                }
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn from_parts(nodes: Vec<TreeNode>, n_features: usize, depth: usize) -> Self {
        RegressionTree {
            nodes,
            n_features,
            depth,
        }
    }
}

fn placeholder() -> TreeNode {
    TreeNode::Leaf {
        value: 0.0,
        n_samples: 0,
    }
}

fn can_split(
    features: &ArrayView2<'_, Feature>,
    targets: &ArrayView1<'_, Label>,
    rows: &[usize],
    depth: usize,
    params: &TreeParams,
) -> bool {
    if params.max_depth.map_or(false, |max| depth >= max) {
        return false;
    }
    if rows.len() < params.min_samples_split || rows.len() < 2 * params.min_samples_leaf {
        return false;
    }
    if features.ncols() == 0 {
        return false;
    }
    let first = targets[rows[0]];
    rows.iter().any(|&r| targets[r] != first)
}

fn mean(targets: &ArrayView1<'_, Label>, rows: &[usize]) -> Score {
    rows.iter().map(|&r| targets[r]).sum::<f64>() / rows.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use tempfile::TempDir;

    fn step_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![[0.0, 1.0], [1.0, 1.0], [2.0, 0.0], [3.0, 0.0], [4.0, 1.0], [5.0, 0.0]];
        let y = array![1.0, 1.0, 1.0, 7.0, 7.0, 7.0];
        (x, y)
    }

    #[test]
    fn test_fits_step_function_exactly() {
        let (x, y) = step_data();
        let tree = RegressionTree::fit(x.view(), y.view(), &TreeParams::default()).unwrap();

        assert_eq!(tree.predict(x.view()).unwrap(), y);
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_depth_limit_produces_mean_leaf() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![1.0, 2.0, 3.0, 6.0];
        let params = TreeParams::new().with_max_depth(1);
        let tree = RegressionTree::fit(x.view(), y.view(), &params).unwrap();
        assert!(tree.depth() <= 1);

        let stump_params = TreeParams::new().with_min_samples_split(10);
        let stump = RegressionTree::fit(x.view(), y.view(), &stump_params).unwrap();
        assert_eq!(stump.n_leaves(), 1);
        assert_eq!(stump.predict(x.view()).unwrap(), array![3.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_rejects_bad_input() {
        let (x, y) = step_data();
        let short = array![1.0, 2.0];
        assert!(RegressionTree::fit(x.view(), short.view(), &TreeParams::default()).is_err());

        let empty_x = Array2::<f64>::zeros((0, 2));
        let empty_y = Array1::<f64>::zeros(0);
        assert!(RegressionTree::fit(empty_x.view(), empty_y.view(), &TreeParams::default()).is_err());

        let tree = RegressionTree::fit(x.view(), y.view(), &TreeParams::default()).unwrap();
        let wrong_width = Array2::<f64>::zeros((3, 5));
        assert!(tree.predict(wrong_width.view()).is_err());
    }

    #[test]
    fn test_seeded_feature_sampling_is_reproducible() {
        let x = Array2::from_shape_fn((40, 6), |(i, j)| ((i * 7 + j * 13) % 17) as f64);
        let y = Array1::from_shape_fn(40, |i| (i % 5) as f64 + x[[i, 2]]);
        let params = TreeParams::new()
            .with_max_features(crate::config::tree::MaxFeatures::Sqrt)
            .with_random_state(11);

        let a = RegressionTree::fit(x.view(), y.view(), &params).unwrap();
        let b = RegressionTree::fit(x.view(), y.view(), &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_artifact_round_trip_is_exact() {
        let (x, y) = step_data();
        let y = y.mapv(|v| v / 3.0);
        let tree = RegressionTree::fit(x.view(), y.view(), &TreeParams::default()).unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tree.bin");
        tree.save_to_file(&path).unwrap();
        let loaded = RegressionTree::load_from_file(&path).unwrap();

        assert_eq!(loaded, tree);
        assert_eq!(loaded.predict(x.view()).unwrap(), tree.predict(x.view()).unwrap());
    }

    #[test]
    fn test_fitted_trees_validate() {
        let (x, y) = step_data();
        let tree = RegressionTree::fit(x.view(), y.view(), &TreeParams::default()).unwrap();
        assert!(tree.validate().is_ok());

        let leaf = RegressionTree::from_parts(vec![placeholder()], 0, 0);
        assert!(leaf.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_malformed_layouts() {
        let split = |feature, left, right| TreeNode::Split {
            feature,
            threshold: 0.5,
            left,
            right,
            gain: 1.0,
            n_samples: 4,
        };

        let empty = RegressionTree::from_parts(vec![], 2, 0);
        let self_loop = RegressionTree::from_parts(vec![split(0, 0, 0)], 2, 1);
        let backwards = RegressionTree::from_parts(
            vec![split(0, 1, 2), split(1, 0, 2), placeholder()],
            2,
            2,
        );
        let past_end = RegressionTree::from_parts(vec![split(0, 1, 5), placeholder()], 2, 1);
        let bad_feature =
            RegressionTree::from_parts(vec![split(2, 1, 2), placeholder(), placeholder()], 2, 1);

        for tree in [empty, self_loop, backwards, past_end, bad_feature] {
            assert!(matches!(
                tree.validate(),
                Err(EnsembleError::InvalidInput { .. })
            ));
        }
    }
}
