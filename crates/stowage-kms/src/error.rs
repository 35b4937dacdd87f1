//! KMS error types.

use thiserror::Error;

/// Boxed error from a keeper implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while encrypting payloads.
#[derive(Debug, Error)]
pub enum KmsError {
  /// No opener is registered for the reference's scheme.
  #[error("failed to open kms {reference}: unsupported key scheme")]
  UnsupportedScheme { reference: String },

  /// The keeper named by the reference could not be opened.
  #[error("failed to open kms {reference}: {source}")]
  KeeperUnavailable {
    reference: String,
    #[source]
    source: BoxError,
  },

  /// The keeper failed to encrypt the payload.
  #[error("failed to encrypt with kms: {source}")]
  EncryptionFailed {
    reference: String,
    #[source]
    source: BoxError,
  },
}
