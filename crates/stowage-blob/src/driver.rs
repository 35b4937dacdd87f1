use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use crate::Bucket;
use crate::destination::Destination;
use crate::error::BlobError;
use crate::options::WriteOptions;
use crate::registry::BucketRegistry;

/// Uploads objects to one bucket for the duration of a run.
///
/// `upload` may be called concurrently once the driver is open.
#[async_trait]
pub trait Driver: Send + Sync {
  /// Connect to the bucket named by a destination string.
  async fn open(&self, destination: &str) -> Result<(), BlobError>;

  /// Write `data` under `key`.
  async fn upload(&self, key: &str, data: Bytes) -> Result<(), BlobError>;

  /// Disconnect. Closing a driver that is not open does nothing.
  async fn close(&self) -> Result<(), BlobError>;
}

/// A [`Driver`] that opens backends through a [`BucketRegistry`].
pub struct BucketDriver {
  registry: Arc<BucketRegistry>,
  acl: String,
  bucket: RwLock<Option<Arc<dyn Bucket>>>,
}

impl BucketDriver {
  /// Create a driver. A non-empty `acl` is applied to every write.
  pub fn new(registry: Arc<BucketRegistry>, acl: impl Into<String>) -> Self {
    Self {
      registry,
      acl: acl.into(),
      bucket: RwLock::new(None),
    }
  }

  // Each call clones the backend handle out of the lock, so writes never
  // hold it while awaiting.
  fn current(&self) -> Option<Arc<dyn Bucket>> {
    self
      .bucket
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .clone()
  }
}

#[async_trait]
impl Driver for BucketDriver {
  async fn open(&self, destination: &str) -> Result<(), BlobError> {
    if self.current().is_some() {
      return Err(BlobError::AlreadyOpen);
    }

    let destination = Destination::parse(destination)?;
    debug!(bucket = %destination, "opening bucket");

    let bucket = self.registry.open(&destination).await?;
    *self.bucket.write().unwrap_or_else(|e| e.into_inner()) = Some(bucket);
    Ok(())
  }

  async fn upload(&self, key: &str, data: Bytes) -> Result<(), BlobError> {
    let bucket = self.current().ok_or(BlobError::NotOpen)?;
    let options = WriteOptions::for_key(&bucket.provider(), key, &self.acl)?;

    info!(path = %key, size = data.len(), "uploading");
    bucket
      .write(key, data, &options)
      .await
      .map_err(|source| BlobError::Write {
        key: key.to_string(),
        source,
      })
  }

  async fn close(&self) -> Result<(), BlobError> {
    let bucket = self.bucket.write().unwrap_or_else(|e| e.into_inner()).take();
    match bucket {
      Some(bucket) => {
        debug!("closing bucket");
        bucket.close().await.map_err(|source| BlobError::Close { source })
      }
      None => Ok(()),
    }
  }
}
