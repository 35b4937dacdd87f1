use crate::destination::Provider;
use crate::error::BlobError;

/// Options for a single object write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
  /// `Content-Disposition` for the stored object.
  pub content_disposition: String,
  /// Provider-specific settings.
  pub provider: ProviderOptions,
}

/// Settings that only one provider understands.
///
/// Backends match on the variant for their own provider and treat anything
/// else as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProviderOptions {
  #[default]
  None,
  S3(S3WriteOptions),
}

/// Write settings specific to S3-compatible backends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3WriteOptions {
  /// Canned ACL, e.g. `public-read`.
  pub acl: Option<String>,
}

impl WriteOptions {
  /// Build the options for writing `key` to a backend of `provider`.
  ///
  /// An ACL is only meaningful for S3-compatible backends; requesting one
  /// from any other provider is [`BlobError::DriverIncompatible`].
  pub fn for_key(provider: &Provider, key: &str, acl: &str) -> Result<Self, BlobError> {
    let provider_options = if acl.is_empty() {
      ProviderOptions::None
    } else if *provider == Provider::S3 {
      ProviderOptions::S3(S3WriteOptions {
        acl: Some(acl.to_string()),
      })
    } else {
      return Err(BlobError::DriverIncompatible {
        provider: provider.to_string(),
        option: "acl",
      });
    };

    Ok(Self {
      content_disposition: content_disposition(key),
      provider: provider_options,
    })
  }
}

fn content_disposition(key: &str) -> String {
  let name = key.rsplit('/').next().unwrap_or(key);
  format!("attachment; filename={}", name)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_content_disposition_uses_base_name() {
    let options = WriteOptions::for_key(&Provider::Gcs, "stowage/v1.0.0/app.tar.gz", "").unwrap();
    assert_eq!(options.content_disposition, "attachment; filename=app.tar.gz");
    assert_eq!(options.provider, ProviderOptions::None);
  }

  #[test]
  fn test_acl_for_s3() {
    let options = WriteOptions::for_key(&Provider::S3, "app.tar.gz", "public-read").unwrap();
    assert_eq!(
      options.provider,
      ProviderOptions::S3(S3WriteOptions {
        acl: Some("public-read".to_string())
      })
    );
  }

  #[test]
  fn test_acl_for_other_providers_is_incompatible() {
    for provider in [Provider::Azure, Provider::Gcs, Provider::File, Provider::Memory] {
      let err = WriteOptions::for_key(&provider, "app.tar.gz", "public-read").unwrap_err();
      assert!(matches!(err, BlobError::DriverIncompatible { option: "acl", .. }));
    }
  }
}
