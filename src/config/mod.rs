//! Configuration management.
//!
//! - [`tree`]: [`TreeParams`] and the [`MaxFeatures`] policy shared by every
//!   member tree
//! - [`core`]: [`ExperimentConfig`] and its builder
//! - [`service`]: [`ServiceConfig`] for the experiment service

pub mod core;
pub mod service;
pub mod tree;

pub use self::core::{ExperimentConfig, ExperimentConfigBuilder};
pub use self::service::ServiceConfig;
pub use self::tree::{MaxFeatures, TreeParams};
