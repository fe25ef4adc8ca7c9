//! Regression tree learning.
//!
//! Every ensemble member is a [`RegressionTree`]: a CART tree grown greedily
//! on squared error, with an optional per-split feature subset drawn by a
//! [`FeatureSampler`].

pub mod node;
pub mod regressor;
pub mod sampling;
pub mod split;

pub use node::TreeNode;
pub use regressor::RegressionTree;
pub use sampling::FeatureSampler;
pub use split::{find_best_split, SplitCandidate};
