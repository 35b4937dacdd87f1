use std::sync::Arc;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use bytes::Bytes;
use tracing::debug;

use crate::destination::{
  Destination, PARAM_DISABLE_TLS, PARAM_ENDPOINT, PARAM_PATH_STYLE, PARAM_REGION, Provider,
};
use crate::error::BoxError;
use crate::options::{ProviderOptions, S3WriteOptions, WriteOptions};
use crate::{Bucket, BucketOpener};

/// An S3 or S3-compatible bucket.
pub struct S3Bucket {
  client: aws_sdk_s3::Client,
  bucket: String,
}

impl S3Bucket {
  pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
    Self {
      client,
      bucket: bucket.into(),
    }
  }
}

#[async_trait]
impl Bucket for S3Bucket {
  fn provider(&self) -> Provider {
    Provider::S3
  }

  async fn write(&self, key: &str, data: Bytes, options: &WriteOptions) -> Result<(), BoxError> {
    let mut request = self
      .client
      .put_object()
      .bucket(&self.bucket)
      .key(key)
      .content_disposition(&options.content_disposition)
      .body(ByteStream::from(data));

    if let ProviderOptions::S3(S3WriteOptions { acl: Some(acl) }) = &options.provider {
      request = request.acl(ObjectCannedAcl::from(acl.as_str()));
    }

    // The full error context carries the service code (NoSuchBucket, ...)
    // that classification relies on.
    request
      .send()
      .await
      .map_err(|e| DisplayErrorContext(&e).to_string())?;
    Ok(())
  }
}

/// Opens `s3://bucket?...` destinations with credentials from the
/// environment.
///
/// Recognized query parameters: `endpoint`, `region`, `s3ForcePathStyle`
/// and `disableSSL`.
pub struct S3Opener;

/// Prefix a bare `host:port` endpoint with the scheme implied by the TLS flag.
fn endpoint_url(endpoint: &str, disable_tls: bool) -> String {
  if endpoint.contains("://") {
    endpoint.to_string()
  } else if disable_tls {
    format!("http://{}", endpoint)
  } else {
    format!("https://{}", endpoint)
  }
}

#[async_trait]
impl BucketOpener for S3Opener {
  async fn open(&self, destination: &Destination) -> Result<Arc<dyn Bucket>, BoxError> {
    let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let mut config = aws_sdk_s3::config::Builder::from(&shared);

    if let Some(region) = destination.param(PARAM_REGION) {
      config = config.region(Region::new(region.to_string()));
    }

    if let Some(endpoint) = destination.param(PARAM_ENDPOINT) {
      let disable_tls = destination.flag(PARAM_DISABLE_TLS).unwrap_or(false);
      let url = endpoint_url(endpoint, disable_tls);
      debug!(endpoint = %url, "using custom s3 endpoint");
      config = config.endpoint_url(url);
    }

    if let Some(path_style) = destination.flag(PARAM_PATH_STYLE) {
      config = config.force_path_style(path_style);
    }

    let client = aws_sdk_s3::Client::from_conf(config.build());
    Ok(Arc::new(S3Bucket::new(client, destination.bucket())))
  }
}
