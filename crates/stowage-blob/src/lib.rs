//! Stowage Blob
//!
//! Provider-agnostic access to object storage for release uploads.
//!
//! A [`BlobConfig`](stowage_config::BlobConfig) is resolved into a destination
//! string of the form `scheme://bucket[?param=value&...]` by [`bucket_url`].
//! That string is the only thing a [`Driver`] needs to connect: the scheme
//! selects a [`BucketOpener`] from the [`BucketRegistry`], which yields a
//! [`Bucket`] backend shared by every upload of the run.
//!
//! Backends report failures as opaque errors, since the S3, Azure and GCS
//! clients share no error hierarchy. [`classify`] turns the text of those
//! errors into a [`FailureCategory`] with a remediation hint.

mod classify;
mod cloud;
mod destination;
mod driver;
mod error;
mod fs;
mod memory;
mod options;
mod registry;
mod s3;

pub use classify::{ClassifiedError, ErrorClassifier, FailureCategory, Rule, classify};
pub use cloud::{AzureOpener, GcsOpener, ObjectStoreBucket};
pub use destination::{Destination, Provider, bucket_url};
pub use driver::{BucketDriver, Driver};
pub use error::{BlobError, BoxError};
pub use fs::{FsBucket, FsOpener};
pub use memory::{MemoryBucket, MemoryOpener, StoredObject};
pub use options::{ProviderOptions, S3WriteOptions, WriteOptions};
pub use registry::BucketRegistry;
pub use s3::{S3Bucket, S3Opener};

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

/// An open connection to one bucket.
///
/// Implementations must accept concurrent writes. A write either stores the
/// whole payload under `key` or leaves no object visible.
#[async_trait]
pub trait Bucket: Send + Sync {
  /// The provider this backend talks to; selects the write options it accepts.
  fn provider(&self) -> Provider;

  /// Store `data` under `key`, replacing any existing object.
  async fn write(&self, key: &str, data: Bytes, options: &WriteOptions) -> Result<(), BoxError>;

  /// Release the connection.
  async fn close(&self) -> Result<(), BoxError> {
    Ok(())
  }
}

/// Connects to buckets of one URL scheme.
#[async_trait]
pub trait BucketOpener: Send + Sync {
  async fn open(&self, destination: &Destination) -> Result<Arc<dyn Bucket>, BoxError>;
}
