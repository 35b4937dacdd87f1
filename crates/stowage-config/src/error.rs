//! Configuration errors.

use thiserror::Error;

/// Errors raised while defaulting and validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// A blob destination has no bucket template.
  #[error("bucket cannot be empty")]
  EmptyBucket,

  /// A blob destination has no provider template.
  #[error("provider cannot be empty")]
  EmptyProvider,

  /// Parallelism must allow at least one upload.
  #[error("parallelism must be at least 1, got {value}")]
  InvalidParallelism { value: usize },
}
