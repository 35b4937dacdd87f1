//! Blob error types.

use stowage_template::TemplateError;
use thiserror::Error;

/// Boxed error from a storage backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while addressing or writing to a bucket.
#[derive(Debug, Error)]
pub enum BlobError {
  /// A configuration template failed to render.
  #[error(transparent)]
  Template(#[from] TemplateError),

  /// The destination string is not of the form `scheme://bucket`.
  #[error("invalid bucket url: {url}")]
  InvalidDestination { url: String },

  /// No backend is registered for the destination's scheme.
  #[error("unsupported blob provider: {provider}")]
  UnsupportedProvider { provider: String },

  /// Provider-specific write options were requested from a backend that
  /// does not support them.
  #[error("{option} is not supported by the {provider} provider")]
  DriverIncompatible {
    provider: String,
    option: &'static str,
  },

  /// The driver was used before `open` or after `close`.
  #[error("bucket is not open")]
  NotOpen,

  /// The driver was opened twice.
  #[error("bucket is already open")]
  AlreadyOpen,

  /// Connecting to the bucket failed.
  #[error("failed to open bucket {url}: {source}")]
  Open {
    url: String,
    #[source]
    source: BoxError,
  },

  /// Writing an object failed.
  #[error("failed to write {key}: {source}")]
  Write {
    key: String,
    #[source]
    source: BoxError,
  },

  /// Releasing the bucket failed.
  #[error("failed to close bucket: {source}")]
  Close {
    #[source]
    source: BoxError,
  },
}
