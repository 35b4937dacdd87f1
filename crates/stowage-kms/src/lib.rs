//! Stowage KMS
//!
//! Optional encryption of upload payloads through an external key-management
//! service. A key reference such as `awskms://alias/releases?region=eu-west-1`
//! or `age://age1...` names a keeper; the scheme selects the
//! [`KeeperOpener`] that knows how to reach it.
//!
//! The [`ContentEncryptor`] opens a keeper for each payload, encrypts it, and
//! releases the keeper again on every path out.

mod age_keeper;
mod aws;
mod encryptor;
mod error;
mod registry;

pub use age_keeper::AgeOpener;
pub use aws::AwsKmsOpener;
pub use encryptor::ContentEncryptor;
pub use error::{BoxError, KmsError};
pub use registry::{KeeperHandle, KeeperRegistry};

use async_trait::async_trait;

/// An open, encrypt-capable handle to a key.
#[async_trait]
pub trait Keeper: Send + Sync {
  /// Encrypt a complete payload.
  async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, BoxError>;

  /// Release any resources held by the handle.
  fn close(&self) {}
}

/// Opens keepers for one key reference scheme.
#[async_trait]
pub trait KeeperOpener: Send + Sync {
  async fn open(&self, reference: &str) -> Result<Box<dyn Keeper>, BoxError>;
}
