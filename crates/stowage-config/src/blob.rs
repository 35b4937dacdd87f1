use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Folder template used when a blob destination does not set one.
pub const DEFAULT_FOLDER: &str = "{{ project_name }}/{{ tag }}";

/// Configuration for a single blob storage destination.
///
/// All string fields except `acl` and `kms_key` are templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
  /// Bucket name template.
  pub bucket: String,
  /// Provider template, e.g. `s3`, `azblob`, `gs`, `file`.
  pub provider: String,
  /// Folder (key prefix) template.
  pub folder: String,
  /// Custom endpoint template. S3 only.
  pub endpoint: String,
  /// Region template. S3 only.
  pub region: String,
  /// Force path-style addressing. S3 only; defaults to `true` when an
  /// endpoint is set and this is left unset.
  #[serde(rename = "s3_force_path_style", skip_serializing_if = "Option::is_none")]
  pub force_path_style: Option<bool>,
  /// Talk to the endpoint over plain HTTP. S3 only.
  #[serde(rename = "disable_ssl")]
  pub disable_tls: bool,
  /// Canned ACL applied to every written object.
  pub acl: String,
  /// Key reference for encrypting payloads before upload.
  pub kms_key: String,
  /// Artifact ID allow-list. Empty means every eligible artifact.
  pub ids: Vec<String>,
  /// Additional files to upload, outside the artifact catalog.
  pub extra_files: Vec<ExtraFile>,
}

/// A user-declared file pattern uploaded alongside the artifacts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraFile {
  /// Glob template selecting files.
  pub glob: String,
  /// Optional template for the uploaded name. Only valid when the glob
  /// matches a single file.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name_template: Option<String>,
}

impl BlobConfig {
  /// Fill in defaults for unset fields.
  pub fn with_defaults(mut self) -> Self {
    if self.folder.is_empty() {
      self.folder = DEFAULT_FOLDER.to_string();
    }
    self
  }

  /// Reject configurations that cannot address a bucket.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.bucket.trim().is_empty() {
      return Err(ConfigError::EmptyBucket);
    }
    if self.provider.trim().is_empty() {
      return Err(ConfigError::EmptyProvider);
    }
    Ok(())
  }
}
