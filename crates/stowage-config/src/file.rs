use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A filesystem object to place into an archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
  /// Path of the object on disk.
  pub source: PathBuf,
  /// Path of the record inside the archive.
  pub destination: String,
  /// Metadata written instead of what the filesystem reports.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub info: Option<FileInfo>,
}

impl FileEntry {
  pub fn new(source: impl Into<PathBuf>, destination: impl Into<String>) -> Self {
    Self {
      source: source.into(),
      destination: destination.into(),
      info: None,
    }
  }

  pub fn with_info(mut self, info: FileInfo) -> Self {
    self.info = Some(info);
    self
  }
}

/// Metadata override for an archive entry. Unset fields fall back to the
/// filesystem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileInfo {
  /// Permission bits, e.g. `0o755`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub mode: Option<u32>,
  /// Owner name recorded in the header.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub owner: Option<String>,
  /// Group name recorded in the header.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub group: Option<String>,
  /// Modification time (RFC 3339 in config files).
  #[serde(skip_serializing_if = "Option::is_none")]
  pub mtime: Option<DateTime<Utc>>,
}
