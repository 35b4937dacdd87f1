//! Stowage Artifact
//!
//! This crate provides the artifact catalog: the list of build outputs
//! (archives, binaries, checksums, signatures, packages) produced earlier in
//! the release, and composable filters for selecting among them.
//!
//! The catalog is shared between pipeline stages and may be appended to
//! concurrently. Consumers take a snapshot with [`Artifacts::list`] or
//! [`Artifacts::filter`].

mod filter;

pub use filter::Filter;

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// Errors raised while loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("failed to read artifacts from {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse artifacts from {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// The kind of build output an artifact represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
  /// A compressed archive ready for upload.
  UploadableArchive,
  /// A bare binary ready for upload.
  UploadableBinary,
  /// A source archive of the repository.
  UploadableSourceArchive,
  /// A checksums file.
  Checksum,
  /// A detached signature.
  Signature,
  /// A signing certificate.
  Certificate,
  /// A Linux package (deb, rpm, apk).
  LinuxPackage,
  /// A software bill of materials.
  Sbom,
  /// An intermediate binary, not uploaded on its own.
  Binary,
  /// A container image reference.
  DockerImage,
  /// Release metadata.
  Metadata,
}

/// A build output tracked by the release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
  /// File name used when publishing.
  pub name: String,
  /// Location of the artifact on disk.
  pub path: PathBuf,
  /// What kind of output this is.
  #[serde(rename = "type")]
  pub kind: ArtifactKind,
  /// Identifier of the build configuration that produced it.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
}

impl Artifact {
  pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, kind: ArtifactKind) -> Self {
    Self {
      name: name.into(),
      path: path.into(),
      kind,
      id: None,
    }
  }

  pub fn with_id(mut self, id: impl Into<String>) -> Self {
    self.id = Some(id.into());
    self
  }
}

/// Thread-safe catalog of artifacts.
#[derive(Debug, Default)]
pub struct Artifacts {
  items: RwLock<Vec<Artifact>>,
}

impl Artifacts {
  pub fn new() -> Self {
    Self::default()
  }

  /// Load a catalog from a JSON array of artifacts.
  pub fn from_json_file(path: &Path) -> Result<Self, Error> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let items: Vec<Artifact> = serde_json::from_str(&content).map_err(|source| Error::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    Ok(items.into_iter().collect())
  }

  /// Add an artifact to the catalog.
  pub fn add(&self, artifact: Artifact) {
    self.write().push(artifact);
  }

  /// Snapshot of every artifact, in insertion order.
  pub fn list(&self) -> Vec<Artifact> {
    self.read().clone()
  }

  /// Snapshot of the artifacts matching `filter`, in insertion order.
  pub fn filter(&self, filter: &Filter) -> Vec<Artifact> {
    self
      .read()
      .iter()
      .filter(|a| filter.matches(a))
      .cloned()
      .collect()
  }

  pub fn len(&self) -> usize {
    self.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.read().is_empty()
  }

  // A panic while holding the lock cannot leave the vector half-updated,
  // so a poisoned lock is still safe to use.
  fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Artifact>> {
    self.items.read().unwrap_or_else(|e| e.into_inner())
  }

  fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Artifact>> {
    self.items.write().unwrap_or_else(|e| e.into_inner())
  }
}

impl FromIterator<Artifact> for Artifacts {
  fn from_iter<T: IntoIterator<Item = Artifact>>(iter: T) -> Self {
    Self {
      items: RwLock::new(iter.into_iter().collect()),
    }
  }
}
