use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use crate::destination::{Destination, Provider};
use crate::error::BoxError;
use crate::options::WriteOptions;
use crate::{Bucket, BucketOpener};

/// An object stored in a [`MemoryBucket`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
  pub data: Bytes,
  pub options: WriteOptions,
}

/// An in-process bucket. Objects live as long as the bucket.
#[derive(Debug, Default)]
pub struct MemoryBucket {
  objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryBucket {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<StoredObject> {
    self
      .objects
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .get(key)
      .cloned()
  }

  /// Stored keys in lexical order.
  pub fn keys(&self) -> Vec<String> {
    self
      .objects
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .keys()
      .cloned()
      .collect()
  }
}

#[async_trait]
impl Bucket for MemoryBucket {
  fn provider(&self) -> Provider {
    Provider::Memory
  }

  async fn write(&self, key: &str, data: Bytes, options: &WriteOptions) -> Result<(), BoxError> {
    let object = StoredObject {
      data,
      options: options.clone(),
    };
    self
      .objects
      .write()
      .unwrap_or_else(|e| e.into_inner())
      .insert(key.to_string(), object);
    Ok(())
  }
}

/// Opens `mem://name` buckets. Opening the same name twice yields the same
/// bucket, so a caller holding the opener can inspect what was written.
#[derive(Debug, Default)]
pub struct MemoryOpener {
  buckets: Mutex<HashMap<String, Arc<MemoryBucket>>>,
}

impl MemoryOpener {
  pub fn new() -> Self {
    Self::default()
  }

  /// The bucket with the given name, if it has been opened.
  pub fn bucket(&self, name: &str) -> Option<Arc<MemoryBucket>> {
    self
      .buckets
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .get(name)
      .cloned()
  }
}

#[async_trait]
impl BucketOpener for MemoryOpener {
  async fn open(&self, destination: &Destination) -> Result<Arc<dyn Bucket>, BoxError> {
    let bucket = self
      .buckets
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .entry(destination.bucket().to_string())
      .or_default()
      .clone();
    Ok(bucket)
  }
}
