//! Per-split feature sampling.

use crate::config::tree::MaxFeatures;
use crate::core::error::Result;
use crate::core::types::FeatureIndex;
use rand::prelude::*;

/// Draws the candidate features examined at each split.
///
/// Every draw is a uniformly random subset of size `n_sampled`, produced by a
/// partial Fisher-Yates shuffle of a persistent pool. When the policy keeps
/// every feature the pool is returned in column order and the generator is
/// never advanced.
#[derive(Debug, Clone)]
pub struct FeatureSampler {
    rng: StdRng,
    pool: Vec<FeatureIndex>,
    n_sampled: usize,
}

impl FeatureSampler {
    /// Creates a sampler for `n_features` columns under the given policy.
    pub fn new(n_features: usize, max_features: &MaxFeatures, seed: u64) -> Result<Self> {
        let n_sampled = max_features.resolve(n_features)?;

        Ok(FeatureSampler {
            rng: StdRng::seed_from_u64(seed),
            pool: (0..n_features).collect(),
            n_sampled,
        })
    }

    /// Number of features returned by each draw.
    pub fn n_sampled(&self) -> usize {
        self.n_sampled
    }

    /// Total number of features.
    pub fn n_features(&self) -> usize {
        self.pool.len()
    }

    /// Draws the candidate features for one split.
    pub fn sample(&mut self) -> &[FeatureIndex] {
        let n = self.pool.len();
        if self.n_sampled >= n {
            return &self.pool;
        }

        for i in 0..self.n_sampled {
            let j = self.rng.gen_range(i..n);
            self.pool.swap(i, j);
        }
        &self.pool[..self.n_sampled]
    }
}
