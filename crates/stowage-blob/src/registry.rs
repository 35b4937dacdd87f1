use std::collections::HashMap;
use std::sync::Arc;

use crate::cloud::{AzureOpener, GcsOpener};
use crate::destination::Destination;
use crate::error::BlobError;
use crate::fs::FsOpener;
use crate::memory::MemoryOpener;
use crate::s3::S3Opener;
use crate::{Bucket, BucketOpener};

/// Maps URL schemes to bucket openers.
#[derive(Clone, Default)]
pub struct BucketRegistry {
  openers: HashMap<String, Arc<dyn BucketOpener>>,
}

impl BucketRegistry {
  /// An empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry with the built-in `s3`, `azblob`, `gs`, `file` and `mem`
  /// backends.
  pub fn with_defaults() -> Self {
    let mut registry = Self::new();
    registry.register("s3", Arc::new(S3Opener));
    registry.register("azblob", Arc::new(AzureOpener));
    registry.register("gs", Arc::new(GcsOpener));
    registry.register("file", Arc::new(FsOpener));
    registry.register("mem", Arc::new(MemoryOpener::default()));
    registry
  }

  /// Register (or replace) the opener for a scheme.
  pub fn register(&mut self, scheme: impl Into<String>, opener: Arc<dyn BucketOpener>) {
    self.openers.insert(scheme.into(), opener);
  }

  /// Whether an opener is registered for `scheme`.
  pub fn supports(&self, scheme: &str) -> bool {
    self.openers.contains_key(scheme)
  }

  /// Connect to the bucket a destination names.
  pub async fn open(&self, destination: &Destination) -> Result<Arc<dyn Bucket>, BlobError> {
    let scheme = destination.provider().scheme();
    let opener = self
      .openers
      .get(scheme)
      .ok_or_else(|| BlobError::UnsupportedProvider {
        provider: scheme.to_string(),
      })?;

    opener
      .open(destination)
      .await
      .map_err(|source| BlobError::Open {
        url: destination.url().to_string(),
        source,
      })
  }
}
