//! Hyperparameters shared by every member tree of an ensemble.

use crate::core::constants::*;
use crate::core::error::{EnsembleError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// How many features a tree may consider at each split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// Every feature
    All,
    /// `floor(sqrt(n_features))`, at least one
    Sqrt,
    /// `floor(log2(n_features))`, at least one
    Log2,
    /// A fixed number of features
    Count(usize),
    /// A fixed share of the features, at least one
    Fraction(f64),
}

impl Default for MaxFeatures {
    fn default() -> Self {
        MaxFeatures::All
    }
}

impl MaxFeatures {
    /// Check the policy independently of any dataset.
    pub fn validate(&self) -> Result<()> {
        match *self {
            MaxFeatures::Count(0) => Err(EnsembleError::invalid_parameter(
                "max_features",
                "0",
                "must be at least 1",
            )),
            MaxFeatures::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                Err(EnsembleError::invalid_parameter(
                    "max_features",
                    f.to_string(),
                    "fraction must be in range (0.0, 1.0]",
                ))
            }
            _ => Ok(()),
        }
    }

    /// Resolve the policy to a concrete count in `[1, n_features]`.
    pub fn resolve(&self, n_features: usize) -> Result<usize> {
        if n_features == 0 {
            return Err(EnsembleError::invalid_input("feature matrix has no columns"));
        }
        self.validate()?;

        let count = match *self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::Count(count) => {
                if count > n_features {
                    return Err(EnsembleError::invalid_parameter(
                        "max_features",
                        count.to_string(),
                        format!("exceeds the number of features ({})", n_features),
                    ));
                }
                count
            }
            MaxFeatures::Fraction(fraction) => (fraction * n_features as f64).floor() as usize,
        };

        Ok(count.max(1))
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxFeatures::All => write!(f, "all"),
            MaxFeatures::Sqrt => write!(f, "sqrt"),
            MaxFeatures::Log2 => write!(f, "log2"),
            MaxFeatures::Count(count) => write!(f, "{}", count),
            MaxFeatures::Fraction(fraction) => write!(f, "{:?}", fraction),
        }
    }
}

impl FromStr for MaxFeatures {
    type Err = EnsembleError;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim();
        let policy = match value.to_lowercase().as_str() {
            "all" | "none" | "" => MaxFeatures::All,
            "sqrt" => MaxFeatures::Sqrt,
            "log2" => MaxFeatures::Log2,
            other => {
                if let Ok(count) = other.parse::<usize>() {
                    MaxFeatures::Count(count)
                } else if let Ok(fraction) = other.parse::<f64>() {
                    MaxFeatures::Fraction(fraction)
                } else {
                    return Err(EnsembleError::invalid_parameter(
                        "max_features",
                        value,
                        "expected 'all', 'sqrt', 'log2', an integer or a float",
                    ));
                }
            }
        };
        policy.validate()?;
        Ok(policy)
    }
}

impl Serialize for MaxFeatures {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match *self {
            MaxFeatures::All => serializer.serialize_str("all"),
            MaxFeatures::Sqrt => serializer.serialize_str("sqrt"),
            MaxFeatures::Log2 => serializer.serialize_str("log2"),
            MaxFeatures::Count(count) => serializer.serialize_u64(count as u64),
            MaxFeatures::Fraction(fraction) => serializer.serialize_f64(fraction),
        }
    }
}

impl<'de> Deserialize<'de> for MaxFeatures {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Float(f64),
            Text(String),
        }

        let policy = match Raw::deserialize(deserializer)? {
            Raw::Int(count) => MaxFeatures::Count(count as usize),
            Raw::Float(fraction) => MaxFeatures::Fraction(fraction),
            Raw::Text(text) => return text.parse().map_err(serde::de::Error::custom),
        };
        policy.validate().map_err(serde::de::Error::custom)?;
        Ok(policy)
    }
}

fn default_min_samples_split() -> usize {
    DEFAULT_MIN_SAMPLES_SPLIT
}

fn default_min_samples_leaf() -> usize {
    DEFAULT_MIN_SAMPLES_LEAF
}

/// Configuration applied uniformly to every member tree.
///
/// `random_state` doubles as the ensemble seed: bootstrap draws and
/// per-split feature sampling are both derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum tree depth (`None` grows until leaves are pure)
    #[serde(default)]
    pub max_depth: Option<usize>,
    /// Features considered per split
    #[serde(default)]
    pub max_features: MaxFeatures,
    /// Minimum rows a node needs to be split
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    /// Minimum rows in each child of a split
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    /// Seed for reproducible sampling
    #[serde(default)]
    pub random_state: Option<u64>,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams {
            max_depth: None,
            max_features: MaxFeatures::All,
            min_samples_split: DEFAULT_MIN_SAMPLES_SPLIT,
            min_samples_leaf: DEFAULT_MIN_SAMPLES_LEAF,
            random_state: None,
        }
    }
}

impl TreeParams {
    /// Create parameters with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set the per-split feature policy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the minimum rows needed to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set the minimum rows per leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set the random seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Validate the parameters
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == Some(0) {
            return Err(EnsembleError::invalid_parameter(
                "max_depth",
                "0",
                "must be a positive integer",
            ));
        }

        if self.min_samples_split < 2 {
            return Err(EnsembleError::invalid_parameter(
                "min_samples_split",
                self.min_samples_split.to_string(),
                "must be at least 2",
            ));
        }

        if self.min_samples_leaf < 1 {
            return Err(EnsembleError::invalid_parameter(
                "min_samples_leaf",
                self.min_samples_leaf.to_string(),
                "must be at least 1",
            ));
        }

        self.max_features.validate()
    }
}
