//! Model directory round-trip tests.

use ensembles_rust::tree::TreeNode;
use ensembles_rust::*;

use std::fs;
use std::path::Path;
use tempfile::TempDir;

mod common;
use common::*;

fn fitted(kind: EnsembleKind, seed: u64) -> (EnsembleModel, ndarray::Array2<f64>) {
    let (features, labels) = create_test_data!(regression, 80, 3);
    let mut model = EnsembleModel::new(
        kind,
        6,
        0.2,
        TreeParams::new().with_max_depth(4).with_random_state(seed),
    )
    .unwrap();
    model.fit(features.view(), labels.view(), FitOptions::new()).unwrap();
    (model, features)
}

fn read_all(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files = Vec::new();
    for entry in walk(dir) {
        let name = entry.strip_prefix(dir).unwrap().display().to_string();
        files.push((name, fs::read(&entry).unwrap()));
    }
    files.sort();
    files
}

fn walk(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            paths.extend(walk(&path));
        } else {
            paths.push(path);
        }
    }
    paths
}

#[test]
fn test_random_forest_round_trip_is_exact() {
    let (model, features) = fitted(EnsembleKind::RandomForest, 11);
    let dir = TempDir::new().unwrap();
    let model_dir = dir.path().join("forest");

    ModelStore::dump(&model, &model_dir).unwrap();
    let loaded = ModelStore::load_random_forest(&model_dir).unwrap();

    assert_eq!(loaded.n_estimators(), model.n_estimators());
    assert_eq!(loaded.trees(), model.trees());
    assert_eq!(
        loaded.predict(features.view()).unwrap(),
        model.predict(features.view()).unwrap()
    );
}

#[test]
fn test_gradient_boosting_round_trip_is_exact() {
    let (model, features) = fitted(EnsembleKind::GradientBoosting, 12);
    let dir = TempDir::new().unwrap();
    let model_dir = dir.path().join("nested").join("booster");

    ModelStore::dump(&model, &model_dir).unwrap();
    let loaded = ModelStore::load(EnsembleKind::GradientBoosting, &model_dir).unwrap();

    assert_eq!(loaded.kind(), EnsembleKind::GradientBoosting);
    assert_eq!(loaded.learning_rate(), Some(0.2));
    assert_eq!(loaded.const_prediction(), model.const_prediction());
    assert_eq!(
        loaded.predict(features.view()).unwrap(),
        model.predict(features.view()).unwrap()
    );
}

#[test]
fn test_dump_into_existing_directory_leaves_it_untouched() {
    let (first, _) = fitted(EnsembleKind::GradientBoosting, 1);
    let (second, _) = fitted(EnsembleKind::RandomForest, 2);
    let dir = TempDir::new().unwrap();
    let model_dir = dir.path().join("model");

    ModelStore::dump(&first, &model_dir).unwrap();
    let before = read_all(&model_dir);

    let err = ModelStore::dump(&second, &model_dir).unwrap_err();
    assert!(matches!(err, EnsembleError::AlreadyExists { .. }));
    assert_eq!(read_all(&model_dir), before);
}

#[test]
fn test_dump_into_existing_empty_directory_fails() {
    let (model, _) = fitted(EnsembleKind::RandomForest, 3);
    let dir = TempDir::new().unwrap();

    let err = ModelStore::dump(&model, dir.path()).unwrap_err();
    assert!(matches!(err, EnsembleError::AlreadyExists { .. }));
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn test_missing_tree_is_corrupt() {
    let (model, _) = fitted(EnsembleKind::RandomForest, 4);
    let dir = TempDir::new().unwrap();
    let model_dir = dir.path().join("model");
    ModelStore::dump(&model, &model_dir).unwrap();

    fs::remove_file(model_dir.join("trees").join(ModelStore::tree_file_name(5))).unwrap();

    let err = ModelStore::load(EnsembleKind::RandomForest, &model_dir).unwrap_err();
    assert!(matches!(err, EnsembleError::CorruptModel { .. }));
}

#[test]
fn test_garbled_tree_is_corrupt() {
    let (model, _) = fitted(EnsembleKind::GradientBoosting, 5);
    let dir = TempDir::new().unwrap();
    let model_dir = dir.path().join("model");
    ModelStore::dump(&model, &model_dir).unwrap();

    fs::write(model_dir.join("trees").join(ModelStore::tree_file_name(0)), b"garbage").unwrap();

    let err = ModelStore::load(EnsembleKind::GradientBoosting, &model_dir).unwrap_err();
    assert!(matches!(err, EnsembleError::CorruptModel { .. }));
}

#[test]
fn test_missing_params_is_corrupt() {
    let (model, _) = fitted(EnsembleKind::RandomForest, 6);
    let dir = TempDir::new().unwrap();
    let model_dir = dir.path().join("model");
    ModelStore::dump(&model, &model_dir).unwrap();

    fs::remove_file(model_dir.join(PARAMS_FILE_NAME)).unwrap();

    assert!(!ModelStore::is_model_dir(&model_dir));
    let err = ModelStore::load(EnsembleKind::RandomForest, &model_dir).unwrap_err();
    assert!(matches!(err, EnsembleError::CorruptModel { .. }));
}

/// Same field layout as `RegressionTree`, so bincode writes an identical
/// artifact for whatever nodes are given.
#[derive(serde::Serialize)]
struct RawTree {
    nodes: Vec<TreeNode>,
    n_features: usize,
    depth: usize,
}

fn overwrite_first_tree(model_dir: &Path, tree: &RawTree) {
    let bytes = bincode::serialize(tree).unwrap();
    fs::write(model_dir.join("trees").join(ModelStore::tree_file_name(0)), bytes).unwrap();
}

#[test]
fn test_decodable_but_malformed_tree_is_corrupt() {
    let leaf = TreeNode::Leaf {
        value: 1.0,
        n_samples: 3,
    };
    let split = |feature, left, right| TreeNode::Split {
        feature,
        threshold: 0.0,
        left,
        right,
        gain: 1.0,
        n_samples: 6,
    };
    let malformed = [
        RawTree {
            nodes: vec![],
            n_features: 3,
            depth: 0,
        },
        RawTree {
            nodes: vec![split(0, 0, 0)],
            n_features: 3,
            depth: 1,
        },
        RawTree {
            nodes: vec![split(0, 1, 9), leaf.clone()],
            n_features: 3,
            depth: 1,
        },
        RawTree {
            nodes: vec![split(7, 1, 2), leaf.clone(), leaf.clone()],
            n_features: 3,
            depth: 1,
        },
    ];

    for tree in &malformed {
        let (model, _) = fitted(EnsembleKind::RandomForest, 7);
        let dir = TempDir::new().unwrap();
        let model_dir = dir.path().join("model");
        ModelStore::dump(&model, &model_dir).unwrap();
        overwrite_first_tree(&model_dir, tree);

        let err = ModelStore::load(EnsembleKind::RandomForest, &model_dir).unwrap_err();
        assert!(matches!(err, EnsembleError::CorruptModel { .. }));
    }
}

#[test]
fn test_well_formed_replacement_tree_still_loads() {
    let (model, features) = fitted(EnsembleKind::RandomForest, 8);
    let dir = TempDir::new().unwrap();
    let model_dir = dir.path().join("model");
    ModelStore::dump(&model, &model_dir).unwrap();

    let stump = RawTree {
        nodes: vec![
            TreeNode::Split {
                feature: 2,
                threshold: 0.0,
                left: 1,
                right: 2,
                gain: 1.0,
                n_samples: 80,
            },
            TreeNode::Leaf {
                value: -1.0,
                n_samples: 40,
            },
            TreeNode::Leaf {
                value: 1.0,
                n_samples: 40,
            },
        ],
        n_features: 3,
        depth: 1,
    };
    overwrite_first_tree(&model_dir, &stump);

    let loaded = ModelStore::load(EnsembleKind::RandomForest, &model_dir).unwrap();
    assert_eq!(loaded.predict(features.view()).unwrap().len(), features.nrows());
}
