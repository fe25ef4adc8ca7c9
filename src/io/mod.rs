//! Model persistence.

pub mod model_store;

pub use model_store::{ModelParams, ModelStore};
