//! Stowage Config
//!
//! This crate contains the serializable configuration types for stowage.
//! These types represent the user's release configuration before any
//! template inside them is resolved.
//!
//! Configuration is loaded from JSON files by the CLI. Every string field
//! documented as a template is rendered exactly once per run by the upload
//! pipeline, against the release context.

mod blob;
mod error;
mod file;

pub use blob::{BlobConfig, DEFAULT_FOLDER, ExtraFile};
pub use error::ConfigError;
pub use file::{FileEntry, FileInfo};

use serde::{Deserialize, Serialize};

/// Default number of uploads allowed in flight at once.
pub const DEFAULT_PARALLELISM: usize = 4;

/// Top-level stowage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
  /// Name of the project being released, exposed to templates as `project_name`.
  pub project_name: String,
  /// Maximum number of concurrent uploads.
  #[serde(default = "default_parallelism")]
  pub parallelism: usize,
  /// Blob destinations, processed in order.
  #[serde(default)]
  pub blobs: Vec<BlobConfig>,
}

fn default_parallelism() -> usize {
  DEFAULT_PARALLELISM
}

impl Config {
  /// Apply defaults to every blob destination and validate the result.
  pub fn validated(mut self) -> Result<Self, ConfigError> {
    if self.parallelism == 0 {
      return Err(ConfigError::InvalidParallelism {
        value: self.parallelism,
      });
    }
    self.blobs = self
      .blobs
      .into_iter()
      .map(|blob| {
        let blob = blob.with_defaults();
        blob.validate()?;
        Ok(blob)
      })
      .collect::<Result<_, ConfigError>>()?;
    Ok(self)
  }
}
