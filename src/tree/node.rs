//! Tree node representation.

use crate::core::types::{FeatureIndex, NodeIndex, Score};
use serde::{Deserialize, Serialize};

/// A node of a fitted regression tree.
///
/// Nodes live in a flat vector; the root is index 0 and children are
/// referenced by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Internal node: rows with `x[feature] <= threshold` go left
    Split {
        /// Feature tested at this node
        feature: FeatureIndex,
        /// Split threshold
        threshold: f64,
        /// Left child index
        left: NodeIndex,
        /// Right child index
        right: NodeIndex,
        /// Reduction in summed squared error achieved by the split
        gain: f64,
        /// Training rows that reached this node
        n_samples: usize,
    },
    /// Terminal node predicting the mean target of its training rows
    Leaf {
        /// Predicted value
        value: Score,
        /// Training rows that reached this leaf
        n_samples: usize,
    },
}

impl TreeNode {
    /// Check if this node is a leaf
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    /// Number of training rows that reached this node
    pub fn n_samples(&self) -> usize {
        match self {
            TreeNode::Split { n_samples, .. } | TreeNode::Leaf { n_samples, .. } => *n_samples,
        }
    }
}
