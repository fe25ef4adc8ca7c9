//! Core trait definitions.

use crate::core::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Trait for components stored as standalone bincode artifacts.
///
/// Bincode writes `f64` values as their raw bit patterns, so a saved and
/// reloaded component holds exactly the same numbers.
pub trait Persistable: Serialize + for<'de> Deserialize<'de> {
    /// Save component to a file, creating or truncating it.
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Load component from a file.
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self>
    where
        Self: Sized,
    {
        let reader = BufReader::new(File::open(path)?);
        Ok(bincode::deserialize_from(reader)?)
    }
}
