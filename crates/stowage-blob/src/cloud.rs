//! Azure Blob Storage and Google Cloud Storage backends.
//!
//! Both go through `object_store`, which gives every provider the same
//! `put_opts` call. Credentials come from the environment.

use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload};
use tracing::debug;

use crate::destination::{Destination, Provider};
use crate::error::BoxError;
use crate::options::WriteOptions;
use crate::{Bucket, BucketOpener};

const AZURE_ACCOUNT_ENV: &str = "AZURE_STORAGE_ACCOUNT";
const AZURE_KEY_ENV: &str = "AZURE_STORAGE_KEY";

/// A bucket backed by any `object_store` implementation.
pub struct ObjectStoreBucket {
  provider: Provider,
  store: Arc<dyn ObjectStore>,
}

impl ObjectStoreBucket {
  pub fn new(provider: Provider, store: Arc<dyn ObjectStore>) -> Self {
    Self { provider, store }
  }
}

#[async_trait]
impl Bucket for ObjectStoreBucket {
  fn provider(&self) -> Provider {
    self.provider.clone()
  }

  async fn write(&self, key: &str, data: Bytes, options: &WriteOptions) -> Result<(), BoxError> {
    let path = ObjectPath::parse(key).map_err(|e| error_text(&e))?;

    let mut attributes = Attributes::new();
    attributes.insert(
      Attribute::ContentDisposition,
      AttributeValue::from(options.content_disposition.clone()),
    );
    let put = PutOptions {
      attributes,
      ..Default::default()
    };

    // A put is a single request: the object appears whole or not at all.
    self
      .store
      .put_opts(&path, PutPayload::from(data), put)
      .await
      .map_err(|e| error_text(&e))?;
    Ok(())
  }
}

/// Opens `azblob://<container>` destinations.
///
/// The storage account and key are read from `AZURE_STORAGE_ACCOUNT` and
/// `AZURE_STORAGE_KEY`; any other `AZURE_*` setting `object_store`
/// understands (SAS tokens, service principals) is honored too.
pub struct AzureOpener;

#[async_trait]
impl BucketOpener for AzureOpener {
  async fn open(&self, destination: &Destination) -> Result<Arc<dyn Bucket>, BoxError> {
    let mut builder = MicrosoftAzureBuilder::from_env().with_container_name(destination.bucket());
    if let Ok(account) = env::var(AZURE_ACCOUNT_ENV) {
      builder = builder.with_account(account);
    }
    if let Ok(key) = env::var(AZURE_KEY_ENV) {
      builder = builder.with_access_key(key);
    }

    let store = builder.build().map_err(|e| error_text(&e))?;
    debug!(container = %destination.bucket(), "opened azure container");
    Ok(Arc::new(ObjectStoreBucket::new(Provider::Azure, Arc::new(store))))
  }
}

/// Opens `gs://<bucket>` destinations with Google application credentials.
pub struct GcsOpener;

#[async_trait]
impl BucketOpener for GcsOpener {
  async fn open(&self, destination: &Destination) -> Result<Arc<dyn Bucket>, BoxError> {
    let store = GoogleCloudStorageBuilder::from_env()
      .with_bucket_name(destination.bucket())
      .build()
      .map_err(|e| error_text(&e))?;
    debug!(bucket = %destination.bucket(), "opened gcs bucket");
    Ok(Arc::new(ObjectStoreBucket::new(Provider::Gcs, Arc::new(store))))
  }
}

/// Render an error with its whole source chain.
///
/// Service codes such as `ContainerNotFound` or `invalid_grant` sit in the
/// innermost errors, and classification only sees this text.
fn error_text(error: &(dyn std::error::Error + 'static)) -> String {
  let mut text = error.to_string();
  let mut source = error.source();
  while let Some(inner) = source {
    let inner_text = inner.to_string();
    if !text.contains(&inner_text) {
      text.push_str(": ");
      text.push_str(&inner_text);
    }
    source = inner.source();
  }
  text
}
