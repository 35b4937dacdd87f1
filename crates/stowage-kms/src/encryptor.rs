use std::sync::Arc;

use crate::error::KmsError;
use crate::registry::KeeperRegistry;

/// Encrypts upload payloads with the keeper named by a key reference.
#[derive(Clone)]
pub struct ContentEncryptor {
  registry: Arc<KeeperRegistry>,
}

impl ContentEncryptor {
  pub fn new(registry: Arc<KeeperRegistry>) -> Self {
    Self { registry }
  }

  /// Encrypt `data` with the keeper named by `key_ref`.
  ///
  /// An empty reference returns the payload unchanged. The keeper is opened
  /// for this call only and released before returning, whether or not the
  /// encryption succeeded.
  pub async fn encrypt(&self, data: Vec<u8>, key_ref: &str) -> Result<Vec<u8>, KmsError> {
    if key_ref.is_empty() {
      return Ok(data);
    }

    let keeper = self.registry.open(key_ref).await?;
    keeper
      .encrypt(&data)
      .await
      .map_err(|source| KmsError::EncryptionFailed {
        reference: keeper.reference().to_string(),
        source,
      })
  }
}
