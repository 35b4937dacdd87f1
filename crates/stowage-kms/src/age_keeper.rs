use std::io::Write;

use age::x25519::Recipient;
use async_trait::async_trait;

use crate::error::BoxError;
use crate::{Keeper, KeeperOpener};

/// Opens `age://<recipient>` references.
///
/// Encryption only needs the recipient's public key, so no service is
/// contacted. Payloads are decrypted with the matching age identity.
pub struct AgeOpener;

struct AgeKeeper {
  recipient: Recipient,
}

#[async_trait]
impl KeeperOpener for AgeOpener {
  async fn open(&self, reference: &str) -> Result<Box<dyn Keeper>, BoxError> {
    let key = reference.strip_prefix("age://").unwrap_or(reference);
    let recipient = key
      .parse::<Recipient>()
      .map_err(|e| format!("invalid age recipient: {}", e))?;
    Ok(Box::new(AgeKeeper { recipient }))
  }
}

#[async_trait]
impl Keeper for AgeKeeper {
  async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, BoxError> {
    let encryptor = age::Encryptor::with_recipients(vec![Box::new(self.recipient.clone())])
      .ok_or("no age recipients")?;

    let mut encrypted = Vec::with_capacity(plaintext.len() + 256);
    let mut writer = encryptor.wrap_output(&mut encrypted)?;
    writer.write_all(plaintext)?;
    writer.finish()?;
    Ok(encrypted)
  }
}
