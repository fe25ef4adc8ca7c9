//! Exhaustive squared-error split search.

use crate::core::types::{Feature, FeatureIndex, Label};
use ndarray::{ArrayView1, ArrayView2};
use std::cmp::Ordering;

/// Smallest reduction in summed squared error accepted for a split.
const MIN_SPLIT_GAIN: f64 = 1e-12;

/// Best split found for a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitCandidate {
    /// Feature to split on
    pub feature: FeatureIndex,
    /// Rows with `x[feature] <= threshold` go left
    pub threshold: f64,
    /// Reduction in summed squared error
    pub gain: f64,
    /// Rows sent left
    pub left_count: usize,
}

/// Finds the split of `rows` maximizing the reduction in squared error.
///
/// Scans every boundary between distinct sorted values of every candidate
/// feature. Candidates are compared with the proxy
/// `sum_l^2 / n_l + sum_r^2 / n_r`, which differs from the error reduction
/// only by a per-node constant. Ties keep the earliest candidate.
pub fn find_best_split(
    features: &ArrayView2<'_, Feature>,
    targets: &ArrayView1<'_, Label>,
    rows: &[usize],
    candidates: &[FeatureIndex],
    min_samples_leaf: usize,
) -> Option<SplitCandidate> {
    let n = rows.len();
    if n < 2 || n < 2 * min_samples_leaf {
        return None;
    }

    let total_sum: f64 = rows.iter().map(|&r| targets[r]).sum();
    let parent_proxy = total_sum * total_sum / n as f64;

    let mut best: Option<SplitCandidate> = None;
    let mut best_proxy = f64::NEG_INFINITY;
    let mut pairs: Vec<(Feature, Label)> = Vec::with_capacity(n);

    for &feature in candidates {
        pairs.clear();
        pairs.extend(rows.iter().map(|&r| (features[[r, feature]], targets[r])));
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        if pairs[0].0 == pairs[n - 1].0 {
            continue;
        }

        let mut left_sum = 0.0;
        for i in 0..n - 1 {
            left_sum += pairs[i].1;
            let left_count = i + 1;
            let right_count = n - left_count;

            if pairs[i].0 == pairs[i + 1].0 {
                continue;
            }
            if left_count < min_samples_leaf || right_count < min_samples_leaf {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let proxy = left_sum * left_sum / left_count as f64
                + right_sum * right_sum / right_count as f64;

            if proxy > best_proxy {
                best_proxy = proxy;
                best = Some(SplitCandidate {
                    feature,
                    threshold: midpoint(pairs[i].0, pairs[i + 1].0),
                    gain: proxy - parent_proxy,
                    left_count,
                });
            }
        }
    }

    best.filter(|split| split.gain > MIN_SPLIT_GAIN)
}

/// Threshold between two consecutive distinct sorted values.
fn midpoint(lower: f64, upper: f64) -> f64 {
    let mid = lower + (upper - lower) / 2.0;
    // Rounding can land on `upper`, which would send it left as well.
    if mid >= upper || !mid.is_finite() {
        lower
    } else {
        mid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_finds_step_boundary() {
        let x: Array2<f64> = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![1.0, 1.0, 1.0, 5.0, 5.0, 5.0];
        let rows: Vec<usize> = (0..6).collect();

        let split = find_best_split(&x.view(), &y.view(), &rows, &[0], 1).unwrap();
        assert_eq!(split.feature, 0);
        assert_eq!(split.threshold, 6.5);
        assert_eq!(split.left_count, 3);
        assert!((split.gain - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_picks_informative_feature() {
        let x: Array2<f64> = array![[5.0, 0.0], [1.0, 0.0], [4.0, 1.0], [2.0, 1.0]];
        let y = array![0.0, 0.0, 3.0, 3.0];
        let rows: Vec<usize> = (0..4).collect();

        let split = find_best_split(&x.view(), &y.view(), &rows, &[0, 1], 1).unwrap();
        assert_eq!(split.feature, 1);
        assert_eq!(split.threshold, 0.5);
    }

    #[test]
    fn test_no_split_for_constant_inputs() {
        let x: Array2<f64> = array![[1.0], [1.0], [1.0]];
        let y = array![1.0, 2.0, 3.0];
        let rows: Vec<usize> = (0..3).collect();
        assert!(find_best_split(&x.view(), &y.view(), &rows, &[0], 1).is_none());

        let x: Array2<f64> = array![[1.0], [2.0], [3.0]];
        let y = array![4.0, 4.0, 4.0];
        assert!(find_best_split(&x.view(), &y.view(), &rows, &[0], 1).is_none());
    }

    #[test]
    fn test_respects_min_samples_leaf() {
        let x: Array2<f64> = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![10.0, 0.0, 0.0, 0.0];
        let rows: Vec<usize> = (0..4).collect();

        let split = find_best_split(&x.view(), &y.view(), &rows, &[0], 2).unwrap();
        assert_eq!(split.left_count, 2);
    }

    #[test]
    fn test_midpoint_rounding() {
        let lower = 1.0_f64;
        let upper = f64::from_bits(lower.to_bits() + 1);
        assert_eq!(midpoint(lower, upper), lower);
        assert_eq!(midpoint(0.0, 2.0), 1.0);
    }
}
