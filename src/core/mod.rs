//! Core infrastructure module.
//!
//! Fundamental types, constants, error handling, and the persistence trait
//! used by every other module.
//!
//! - [`types`]: scalar aliases and [`types::EnsembleKind`]
//! - [`constants`]: hyperparameter defaults and on-disk names
//! - [`error`]: [`EnsembleError`] and the crate [`Result`] alias
//! - [`traits`]: [`traits::Persistable`] bincode artifacts

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

pub use constants::*;
pub use error::{EnsembleError, Result};
pub use traits::*;
pub use types::*;

use std::sync::Once;

static LOGGING: Once = Once::new();

/// Initialize the logging subsystem.
///
/// Defaults `RUST_LOG` to `info` when unset and installs `env_logger`.
/// Safe to call repeatedly and alongside an already-installed logger.
pub fn initialize_core() -> Result<()> {
    LOGGING.call_once(|| {
        if std::env::var("RUST_LOG").is_err() {
            std::env::set_var("RUST_LOG", "info");
        }
        let _ = env_logger::try_init();
        log::debug!("ensembles-rust {} initialized", ENSEMBLES_RUST_VERSION);
    });
    Ok(())
}

/// Check whether [`initialize_core`] has run.
pub fn is_core_initialized() -> bool {
    LOGGING.is_completed()
}
