//! Default hyperparameters and on-disk naming constants.

/// Default number of ensemble members.
pub const DEFAULT_N_ESTIMATORS: usize = 100;

/// Default maximum tree depth used by experiment configurations.
pub const DEFAULT_MAX_DEPTH: usize = 15;

/// Default shrinkage applied to every boosting member.
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;

/// Default minimum number of rows required to split a node.
pub const DEFAULT_MIN_SAMPLES_SPLIT: usize = 2;

/// Default minimum number of rows in each leaf.
pub const DEFAULT_MIN_SAMPLES_LEAF: usize = 1;

/// Share of registered rows used for training; the rest is validation.
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.8;

/// Replacement for non-finite predictions returned by the experiment service.
pub const DEFAULT_PREDICTION_FALLBACK: f64 = 0.0;

/// Name of the ensemble parameters file inside a model directory.
pub const PARAMS_FILE_NAME: &str = "params.json";

/// Name of the subdirectory holding one artifact per member.
pub const TREES_DIR_NAME: &str = "trees";

/// Prefix of every tree artifact file name.
pub const TREE_FILE_PREFIX: &str = "tree_";

/// Extension of every tree artifact file name.
pub const TREE_FILE_EXTENSION: &str = "bin";

/// Zero padding width of the member index in tree artifact names.
pub const TREE_INDEX_WIDTH: usize = 4;

/// Experiment directory layout.
pub const EXPERIMENT_CONFIG_FILE: &str = "config.json";
/// Registered training data, stored as CSV.
pub const EXPERIMENT_DATA_FILE: &str = "train_data.csv";
/// Model directory written by the model store.
pub const EXPERIMENT_MODEL_DIR: &str = "model";
/// Convergence history recorded by the last training run.
pub const EXPERIMENT_HISTORY_FILE: &str = "convergence_history.json";

/// Default root directory for experiment runs.
pub const DEFAULT_RUNS_DIR: &str = "runs";

/// Crate version string.
pub const ENSEMBLES_RUST_VERSION: &str = env!("CARGO_PKG_VERSION");
