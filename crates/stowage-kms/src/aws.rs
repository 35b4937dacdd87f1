use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_kms::error::DisplayErrorContext;
use aws_sdk_kms::primitives::Blob;
use url::form_urlencoded;

use crate::error::BoxError;
use crate::{Keeper, KeeperOpener};

/// Opens `awskms://<key>` references against AWS KMS.
///
/// The key may be a key ID, an ARN (`awskms:///arn:aws:kms:...`) or an alias
/// (`awskms://alias/name`). A `region` query parameter overrides the region
/// from the environment.
pub struct AwsKmsOpener;

struct AwsKmsKeeper {
  client: aws_sdk_kms::Client,
  key_id: String,
}

/// Split a reference into its key ID and optional region.
fn parse_reference(reference: &str) -> Result<(String, Option<String>), BoxError> {
  let rest = reference.strip_prefix("awskms://").unwrap_or(reference);
  let (key, query) = rest.split_once('?').unwrap_or((rest, ""));
  let key_id = key.trim_start_matches('/');
  if key_id.is_empty() {
    return Err("missing kms key id".into());
  }

  let region = form_urlencoded::parse(query.as_bytes())
    .find(|(k, _)| k == "region")
    .map(|(_, v)| v.into_owned());

  Ok((key_id.to_string(), region))
}

#[async_trait]
impl KeeperOpener for AwsKmsOpener {
  async fn open(&self, reference: &str) -> Result<Box<dyn Keeper>, BoxError> {
    let (key_id, region) = parse_reference(reference)?;

    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
      loader = loader.region(Region::new(region));
    }
    let shared = loader.load().await;

    Ok(Box::new(AwsKmsKeeper {
      client: aws_sdk_kms::Client::new(&shared),
      key_id,
    }))
  }
}

#[async_trait]
impl Keeper for AwsKmsKeeper {
  async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, BoxError> {
    let output = self
      .client
      .encrypt()
      .key_id(&self.key_id)
      .plaintext(Blob::new(plaintext))
      .send()
      .await
      .map_err(|e| DisplayErrorContext(&e).to_string())?;

    let ciphertext = output
      .ciphertext_blob()
      .ok_or("kms returned no ciphertext")?;
    Ok(ciphertext.as_ref().to_vec())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_reference_alias_with_region() {
    let (key, region) = parse_reference("awskms://alias/releases?region=eu-west-1").unwrap();
    assert_eq!(key, "alias/releases");
    assert_eq!(region.as_deref(), Some("eu-west-1"));
  }

  #[test]
  fn test_parse_reference_arn() {
    let (key, region) =
      parse_reference("awskms:///arn:aws:kms:us-east-1:111122223333:key/abcd").unwrap();
    assert_eq!(key, "arn:aws:kms:us-east-1:111122223333:key/abcd");
    assert_eq!(region, None);
  }

  #[test]
  fn test_parse_reference_requires_key() {
    assert!(parse_reference("awskms://").is_err());
  }
}
