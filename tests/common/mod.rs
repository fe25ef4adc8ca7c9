//! Common test utilities for ensemble integration tests.

#![allow(dead_code)]

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use rand::prelude::*;

/// Create test features uniformly drawn from `[0, 5)`
pub fn create_test_features_regression(num_samples: usize, num_features: usize) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(42);

    let mut features = Array2::zeros((num_samples, num_features));

    for i in 0..num_samples {
        for j in 0..num_features {
            features[[i, j]] = rng.gen_range(0.0..5.0);
        }
    }

    features
}

/// Create strictly positive regression labels from features
pub fn create_test_labels_regression(features: &Array2<f64>) -> Array1<f64> {
    let mut rng = StdRng::seed_from_u64(7);
    let num_samples = features.nrows();
    let mut labels = Array1::zeros(num_samples);

    for i in 0..num_samples {
        let mut label = 10.0;
        for j in 0..features.ncols() {
            label += features[[i, j]] * ((j + 1) as f64 * 0.5);
        }
        labels[i] = label + rng.gen_range(0.0..0.5);
    }

    labels
}

/// Ordered train/validation split of a regression problem
pub struct RegressionSplit {
    pub x_train: Array2<f64>,
    pub y_train: Array1<f64>,
    pub x_val: Array2<f64>,
    pub y_val: Array1<f64>,
}

impl RegressionSplit {
    /// `num_samples` rows, the first `train_fraction` of them for training
    pub fn new(num_samples: usize, num_features: usize, train_fraction: f64) -> Self {
        let features = create_test_features_regression(num_samples, num_features);
        let labels = create_test_labels_regression(&features);
        let n_train = (num_samples as f64 * train_fraction) as usize;

        RegressionSplit {
            x_train: features.slice(s![..n_train, ..]).to_owned(),
            y_train: labels.slice(s![..n_train]).to_owned(),
            x_val: features.slice(s![n_train.., ..]).to_owned(),
            y_val: labels.slice(s![n_train..]).to_owned(),
        }
    }

    pub fn train(&self) -> (ArrayView2<'_, f64>, ArrayView1<'_, f64>) {
        (self.x_train.view(), self.y_train.view())
    }

    pub fn val(&self) -> (ArrayView2<'_, f64>, ArrayView1<'_, f64>) {
        (self.x_val.view(), self.y_val.view())
    }
}

/// Render features and labels as headered CSV with the target last
pub fn create_test_csv(features: &Array2<f64>, labels: &Array1<f64>) -> Vec<u8> {
    let mut content = String::new();

    let names: Vec<String> = (0..features.ncols())
        .map(|i| format!("feature_{}", i))
        .collect();
    content.push_str(&names.join(","));
    content.push_str(",target\n");

    for i in 0..features.nrows() {
        let values: Vec<String> = features.row(i).iter().map(|v| v.to_string()).collect();
        content.push_str(&values.join(","));
        content.push(',');
        content.push_str(&labels[i].to_string());
        content.push('\n');
    }

    content.into_bytes()
}

/// Create test data (features, labels)
#[macro_export]
macro_rules! create_test_data {
    (regression, $samples:expr, $features:expr) => {{
        let features = common::create_test_features_regression($samples, $features);
        let labels = common::create_test_labels_regression(&features);
        (features, labels)
    }};
}
