//! Bucket URL construction and parsing.

use std::collections::BTreeMap;
use std::fmt;

use stowage_config::BlobConfig;
use stowage_template::Template;
use url::form_urlencoded;

use crate::error::BlobError;

pub(crate) const PARAM_DISABLE_TLS: &str = "disableSSL";
pub(crate) const PARAM_ENDPOINT: &str = "endpoint";
pub(crate) const PARAM_REGION: &str = "region";
pub(crate) const PARAM_PATH_STYLE: &str = "s3ForcePathStyle";

/// A storage provider, identified by its URL scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Provider {
  /// `s3://` - Amazon S3 and S3-compatible services.
  S3,
  /// `azblob://` - Azure Blob Storage.
  Azure,
  /// `gs://` - Google Cloud Storage.
  Gcs,
  /// `file://` - a local directory.
  File,
  /// `mem://` - an in-process bucket.
  Memory,
  /// Any other scheme, served by a custom opener.
  Other(String),
}

impl Provider {
  pub fn from_scheme(scheme: &str) -> Self {
    match scheme {
      "s3" => Provider::S3,
      "azblob" => Provider::Azure,
      "gs" => Provider::Gcs,
      "file" => Provider::File,
      "mem" => Provider::Memory,
      other => Provider::Other(other.to_string()),
    }
  }

  pub fn scheme(&self) -> &str {
    match self {
      Provider::S3 => "s3",
      Provider::Azure => "azblob",
      Provider::Gcs => "gs",
      Provider::File => "file",
      Provider::Memory => "mem",
      Provider::Other(scheme) => scheme,
    }
  }
}

impl fmt::Display for Provider {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.scheme())
  }
}

/// Resolve a blob configuration into its destination string.
///
/// Non-S3 providers yield `provider://bucket` and ignore the S3-only
/// endpoint, region, path-style and TLS settings. For S3 the settings are
/// appended as query parameters, sorted by name so that the string is stable.
pub fn bucket_url(config: &BlobConfig, template: &dyn Template) -> Result<String, BlobError> {
  let bucket = template.apply(&config.bucket)?;
  let provider = template.apply(&config.provider)?;

  let url = format!("{}://{}", provider, bucket);
  if Provider::from_scheme(&provider) != Provider::S3 {
    return Ok(url);
  }

  let mut query = BTreeMap::new();

  let endpoint = template.apply(&config.endpoint)?;
  if !endpoint.is_empty() {
    query.insert(PARAM_ENDPOINT, endpoint);
    let path_style = config.force_path_style.unwrap_or(true);
    query.insert(PARAM_PATH_STYLE, path_style.to_string());
  }

  let region = template.apply(&config.region)?;
  if !region.is_empty() {
    query.insert(PARAM_REGION, region);
  }

  if config.disable_tls {
    query.insert(PARAM_DISABLE_TLS, "true".to_string());
  }

  if query.is_empty() {
    return Ok(url);
  }

  let encoded = form_urlencoded::Serializer::new(String::new())
    .extend_pairs(&query)
    .finish();
  Ok(format!("{}?{}", url, encoded))
}

/// A parsed destination string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
  url: String,
  provider: Provider,
  bucket: String,
  params: BTreeMap<String, String>,
}

impl Destination {
  /// Parse `scheme://bucket[?query]`.
  pub fn parse(url: &str) -> Result<Self, BlobError> {
    let invalid = || BlobError::InvalidDestination {
      url: url.to_string(),
    };

    let (scheme, rest) = url.split_once("://").ok_or_else(invalid)?;
    let (bucket, query) = rest.split_once('?').unwrap_or((rest, ""));
    if scheme.is_empty() || bucket.is_empty() {
      return Err(invalid());
    }

    let params = form_urlencoded::parse(query.as_bytes())
      .map(|(k, v)| (k.into_owned(), v.into_owned()))
      .collect();

    Ok(Self {
      url: url.to_string(),
      provider: Provider::from_scheme(scheme),
      bucket: bucket.to_string(),
      params,
    })
  }

  pub fn url(&self) -> &str {
    &self.url
  }

  pub fn provider(&self) -> &Provider {
    &self.provider
  }

  /// The bucket name; for `file://` destinations, the directory path.
  pub fn bucket(&self) -> &str {
    &self.bucket
  }

  pub fn param(&self, name: &str) -> Option<&str> {
    self.params.get(name).map(String::as_str)
  }

  /// A boolean query parameter; absent or unparseable values are `None`.
  pub fn flag(&self, name: &str) -> Option<bool> {
    self.param(name).and_then(|v| v.parse().ok())
  }
}

impl fmt::Display for Destination {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.url)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use stowage_template::ContextTemplate;

  fn template() -> ContextTemplate {
    ContextTemplate::from_json(serde_json::json!({
      "project_name": "stowage",
      "bucket_env": "prod",
      "region_env": "us-west-2",
    }))
  }

  fn s3(endpoint: &str, region: &str) -> BlobConfig {
    BlobConfig {
      bucket: "releases".to_string(),
      provider: "s3".to_string(),
      endpoint: endpoint.to_string(),
      region: region.to_string(),
      ..Default::default()
    }
  }

  #[test]
  fn test_non_s3_providers_ignore_s3_options() {
    for provider in ["gs", "azblob", "file", "mem"] {
      let config = BlobConfig {
        provider: provider.to_string(),
        force_path_style: Some(false),
        disable_tls: true,
        ..s3("http://localhost:9000", "us-east-1")
      };
      let url = bucket_url(&config, &template()).unwrap();
      assert_eq!(url, format!("{}://releases", provider));
    }
  }

  #[test]
  fn test_s3_without_options() {
    let url = bucket_url(&s3("", ""), &template()).unwrap();
    assert_eq!(url, "s3://releases");
  }

  #[test]
  fn test_s3_endpoint_defaults_path_style() {
    let url = bucket_url(&s3("http://localhost:9000", ""), &template()).unwrap();
    assert_eq!(
      url,
      "s3://releases?endpoint=http%3A%2F%2Flocalhost%3A9000&s3ForcePathStyle=true"
    );
  }

  #[test]
  fn test_s3_endpoint_respects_configured_path_style() {
    let config = BlobConfig {
      force_path_style: Some(false),
      ..s3("http://localhost:9000", "")
    };
    let url = bucket_url(&config, &template()).unwrap();
    assert_eq!(
      url,
      "s3://releases?endpoint=http%3A%2F%2Flocalhost%3A9000&s3ForcePathStyle=false"
    );
  }

  #[test]
  fn test_s3_path_style_ignored_without_endpoint() {
    let config = BlobConfig {
      force_path_style: Some(true),
      ..s3("", "")
    };
    assert_eq!(bucket_url(&config, &template()).unwrap(), "s3://releases");
  }

  #[test]
  fn test_s3_all_options_sorted() {
    let config = BlobConfig {
      disable_tls: true,
      ..s3("minio:9000", "us-east-1")
    };
    let url = bucket_url(&config, &template()).unwrap();
    assert_eq!(
      url,
      "s3://releases?disableSSL=true&endpoint=minio%3A9000&region=us-east-1&s3ForcePathStyle=true"
    );
  }

  #[test]
  fn test_templates_are_resolved() {
    let config = BlobConfig {
      bucket: "{{ project_name }}-{{ bucket_env }}".to_string(),
      ..s3("", "{{ region_env }}")
    };
    let url = bucket_url(&config, &template()).unwrap();
    assert_eq!(url, "s3://stowage-prod?region=us-west-2");
  }

  #[test]
  fn test_template_error() {
    let config = BlobConfig {
      bucket: "{{ undefined_thing }}".to_string(),
      ..s3("", "")
    };
    let err = bucket_url(&config, &template()).unwrap_err();
    assert!(matches!(err, BlobError::Template(_)));

    let config = s3("{{ nope }}", "");
    assert!(matches!(
      bucket_url(&config, &template()),
      Err(BlobError::Template(_))
    ));
  }

  #[test]
  fn test_destination_round_trip() {
    let config = BlobConfig {
      disable_tls: true,
      ..s3("minio:9000", "us-east-1")
    };
    let url = bucket_url(&config, &template()).unwrap();
    let destination = Destination::parse(&url).unwrap();

    assert_eq!(destination.provider(), &Provider::S3);
    assert_eq!(destination.bucket(), "releases");
    assert_eq!(destination.param("endpoint"), Some("minio:9000"));
    assert_eq!(destination.param("region"), Some("us-east-1"));
    assert_eq!(destination.flag("s3ForcePathStyle"), Some(true));
    assert_eq!(destination.flag("disableSSL"), Some(true));
    assert_eq!(destination.to_string(), url);
  }

  #[test]
  fn test_destination_file_path() {
    let destination = Destination::parse("file:///tmp/releases").unwrap();
    assert_eq!(destination.provider(), &Provider::File);
    assert_eq!(destination.bucket(), "/tmp/releases");
  }

  #[test]
  fn test_destination_invalid() {
    assert!(Destination::parse("releases").is_err());
    assert!(Destination::parse("s3://").is_err());
  }

  #[test]
  fn test_provider_other_scheme() {
    assert_eq!(Provider::from_scheme("swift"), Provider::Other("swift".to_string()));
    assert_eq!(Provider::from_scheme("azblob").scheme(), "azblob");
  }
}
