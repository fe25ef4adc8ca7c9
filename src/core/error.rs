//! Error handling and error types for the ensembles crate.
//!
//! Every fallible operation returns [`Result`], and every failure is a local,
//! deterministic condition surfaced to the caller. Nothing here is retried
//! internally: a partially fitted ensemble is not a recovery point. Early
//! stopping is a normal way for `fit` to finish and never shows up as an
//! error.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for the ensembles crate.
#[derive(Error, Debug)]
pub enum EnsembleError {
    /// Malformed training or inference input (shape mismatches, empty sets,
    /// half-specified validation pairs, unparsable data).
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the input
        message: String,
    },

    /// Invalid hyperparameter value
    #[error("Invalid parameter: {parameter} = {value}, {reason}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Rejected value, rendered as text
        value: String,
        /// Constraint the value broke
        reason: String,
    },

    /// `predict` or `dump` called before a successful `fit`
    #[error("Model is not fitted: {operation} requires a fitted ensemble")]
    NotFitted {
        /// Operation that was attempted
        operation: String,
    },

    /// `dump` targeted a directory that already exists
    #[error("Model directory already exists: {}", path.display())]
    AlreadyExists {
        /// Existing directory
        path: PathBuf,
    },

    /// `load` targeted a directory that does not exist
    #[error("Model directory not found: {}", path.display())]
    NotFound {
        /// Missing directory
        path: PathBuf,
    },

    /// A stored model is missing artifacts or cannot be decoded
    #[error("Corrupt model at {}: {reason}", path.display())]
    CorruptModel {
        /// Model directory
        path: PathBuf,
        /// Which artifact is broken and how
        reason: String,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error description
        message: String,
    },

    /// An experiment with this name is already registered
    #[error("Experiment '{name}' already exists")]
    ExperimentExists {
        /// Experiment name
        name: String,
    },

    /// No experiment with this name is registered
    #[error("Experiment '{name}' not found")]
    ExperimentNotFound {
        /// Experiment name
        name: String,
    },

    /// The experiment has no trained model yet
    #[error("Model for '{name}' has not been trained yet")]
    NotTrained {
        /// Experiment name
        name: String,
    },

    /// File I/O errors
    #[error("I/O error: {source}")]
    IO {
        /// Underlying error
        #[from]
        source: io::Error,
    },

    /// CSV parsing errors
    #[error("CSV parsing error: {source}")]
    Csv {
        /// Underlying error
        #[from]
        source: csv::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {source}")]
    Json {
        /// Underlying error
        #[from]
        source: serde_json::Error,
    },

    /// Bincode serialization errors
    #[error("Bincode error: {source}")]
    Bincode {
        /// Underlying error
        #[from]
        source: bincode::Error,
    },

    /// TOML parsing errors
    #[error("TOML parsing error: {source}")]
    TomlDe {
        /// Underlying error
        #[from]
        source: toml::de::Error,
    },

    /// TOML serialization errors
    #[error("TOML serialization error: {source}")]
    TomlSer {
        /// Underlying error
        #[from]
        source: toml::ser::Error,
    },

    /// Internal library errors (should not occur in normal usage)
    #[error("Internal error: {message}")]
    Internal {
        /// Error description
        message: String,
    },
}

/// Type alias for Results using EnsembleError
pub type Result<T> = std::result::Result<T, EnsembleError>;

impl EnsembleError {
    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        EnsembleError::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<P, V, R>(parameter: P, value: V, reason: R) -> Self
    where
        P: Into<String>,
        V: Into<String>,
        R: Into<String>,
    {
        EnsembleError::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a not fitted error for the named operation
    pub fn not_fitted<S: Into<String>>(operation: S) -> Self {
        EnsembleError::NotFitted {
            operation: operation.into(),
        }
    }

    /// Create an already exists error
    pub fn already_exists<P: AsRef<Path>>(path: P) -> Self {
        EnsembleError::AlreadyExists {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a not found error
    pub fn not_found<P: AsRef<Path>>(path: P) -> Self {
        EnsembleError::NotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a corrupt model error
    pub fn corrupt_model<P: AsRef<Path>, S: Into<String>>(path: P, reason: S) -> Self {
        EnsembleError::CorruptModel {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        EnsembleError::Config {
            message: message.into(),
        }
    }

    /// Create an internal error (should be used sparingly)
    pub fn internal<S: Into<String>>(message: S) -> Self {
        EnsembleError::Internal {
            message: message.into(),
        }
    }

    /// Check if retrying the same call with the same inputs could succeed.
    ///
    /// Only failures caused by outside state (the filesystem) qualify.
    pub fn is_recoverable(&self) -> bool {
        match self {
            EnsembleError::InvalidInput { .. } => false,
            EnsembleError::InvalidParameter { .. } => false,
            EnsembleError::NotFitted { .. } => false,
            EnsembleError::AlreadyExists { .. } => true,
            EnsembleError::NotFound { .. } => true,
            EnsembleError::CorruptModel { .. } => false,
            EnsembleError::Config { .. } => false,
            EnsembleError::ExperimentExists { .. } => false,
            EnsembleError::ExperimentNotFound { .. } => false,
            EnsembleError::NotTrained { .. } => true,
            EnsembleError::IO { .. } => true,
            EnsembleError::Csv { .. } => false,
            EnsembleError::Json { .. } => false,
            EnsembleError::Bincode { .. } => false,
            EnsembleError::TomlDe { .. } => false,
            EnsembleError::TomlSer { .. } => false,
            EnsembleError::Internal { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            EnsembleError::InvalidInput { .. } => "invalid_input",
            EnsembleError::InvalidParameter { .. } => "invalid_parameter",
            EnsembleError::NotFitted { .. } => "not_fitted",
            EnsembleError::AlreadyExists { .. } => "already_exists",
            EnsembleError::NotFound { .. } => "not_found",
            EnsembleError::CorruptModel { .. } => "corrupt_model",
            EnsembleError::Config { .. } => "config",
            EnsembleError::ExperimentExists { .. } => "experiment_exists",
            EnsembleError::ExperimentNotFound { .. } => "experiment_not_found",
            EnsembleError::NotTrained { .. } => "not_trained",
            EnsembleError::IO { .. } => "io",
            EnsembleError::Csv { .. } => "csv",
            EnsembleError::Json { .. } => "json",
            EnsembleError::Bincode { .. } => "bincode",
            EnsembleError::TomlDe { .. } | EnsembleError::TomlSer { .. } => "toml",
            EnsembleError::Internal { .. } => "internal",
        }
    }
}

/// Convenience macro for invalid input errors
#[macro_export]
macro_rules! invalid_input {
    ($msg:expr) => {
        $crate::core::error::EnsembleError::invalid_input($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::EnsembleError::invalid_input(format!($fmt, $($arg)*))
    };
}

/// Return early with the given error when the condition does not hold
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = EnsembleError::invalid_input("rows differ");
        assert_eq!(err.category(), "invalid_input");
        assert!(!err.is_recoverable());

        let err = EnsembleError::not_fitted("predict");
        assert_eq!(err.category(), "not_fitted");
        assert!(err.to_string().contains("predict"));
    }

    #[test]
    fn test_error_macros() {
        let err = invalid_input!("bad shape: {}", 3);
        assert!(matches!(err, EnsembleError::InvalidInput { .. }));
        assert!(err.to_string().contains("bad shape: 3"));
    }

    #[test]
    fn test_ensure_macro() {
        fn check(value: usize) -> Result<usize> {
            ensure!(value > 0, EnsembleError::invalid_input("empty"));
            Ok(value)
        }

        assert!(check(1).is_ok());
        assert!(matches!(check(0), Err(EnsembleError::InvalidInput { .. })));
    }

    #[test]
    fn test_path_errors_display() {
        let err = EnsembleError::already_exists("/tmp/model");
        assert!(err.to_string().contains("/tmp/model"));

        let err = EnsembleError::corrupt_model("/tmp/model", "missing params.json");
        assert_eq!(err.category(), "corrupt_model");
        assert!(err.to_string().contains("missing params.json"));
    }

    #[test]
    fn test_every_field_reaches_the_message() {
        let err = EnsembleError::invalid_parameter("max_depth", "0", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "Invalid parameter: max_depth = 0, must be at least 1"
        );

        let err = EnsembleError::NotFound {
            path: PathBuf::from("/tmp/gone"),
        };
        assert_eq!(err.to_string(), "Model directory not found: /tmp/gone");

        let err = EnsembleError::ExperimentNotFound {
            name: "run".to_string(),
        };
        assert_eq!(err.to_string(), "Experiment 'run' not found");

        let err = EnsembleError::NotTrained {
            name: "run".to_string(),
        };
        assert_eq!(err.to_string(), "Model for 'run' has not been trained yet");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: EnsembleError = io_err.into();
        assert!(matches!(err, EnsembleError::IO { .. }));
        assert_eq!(err.category(), "io");
    }
}
