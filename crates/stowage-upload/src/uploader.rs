use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use stowage_artifact::{ArtifactKind, Artifacts, Filter};
use stowage_blob::{BucketDriver, BucketRegistry, Driver, bucket_url, classify};
use stowage_config::{BlobConfig, DEFAULT_PARALLELISM};
use stowage_kms::{ContentEncryptor, KeeperRegistry};
use stowage_template::Template;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument};

use crate::error::{TaskError, TaskFailure, UploadError};
use crate::extra_files::find_extra_files;

/// Artifact kinds uploaded to blob storage.
const UPLOADABLE_KINDS: [ArtifactKind; 8] = [
  ArtifactKind::UploadableArchive,
  ArtifactKind::UploadableBinary,
  ArtifactKind::UploadableSourceArchive,
  ArtifactKind::Checksum,
  ArtifactKind::Signature,
  ArtifactKind::Certificate,
  ArtifactKind::LinuxPackage,
  ArtifactKind::Sbom,
];

/// The artifacts a blob destination receives: every uploadable kind,
/// narrowed to the configured IDs when there are any.
pub fn eligible_filter(config: &BlobConfig) -> Filter {
  let filter = Filter::by_kinds(UPLOADABLE_KINDS);
  if config.ids.is_empty() {
    filter
  } else {
    filter.and(Filter::ByIds(config.ids.clone()))
  }
}

/// One file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
  pub source: PathBuf,
  /// Object key, relative to the bucket root.
  pub destination: String,
}

/// Outcome of a successful upload run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
  /// The bucket URL the files were written to.
  pub url: String,
  /// Keys written, in lexical order.
  pub keys: Vec<String>,
}

/// Uploads artifacts to blob destinations.
pub struct BlobUploader {
  buckets: Arc<BucketRegistry>,
  encryptor: ContentEncryptor,
  parallelism: usize,
}

impl BlobUploader {
  pub fn new(buckets: Arc<BucketRegistry>, keepers: Arc<KeeperRegistry>) -> Self {
    Self {
      buckets,
      encryptor: ContentEncryptor::new(keepers),
      parallelism: DEFAULT_PARALLELISM,
    }
  }

  /// Limit the number of uploads in flight. Values below one are raised to one.
  pub fn with_parallelism(mut self, parallelism: usize) -> Self {
    self.parallelism = parallelism.max(1);
    self
  }

  /// Upload to each destination in turn, stopping at the first that fails.
  pub async fn upload_all(
    &self,
    artifacts: &Artifacts,
    configs: &[BlobConfig],
    template: &dyn Template,
  ) -> Result<Vec<UploadReport>, UploadError> {
    let mut reports = Vec::with_capacity(configs.len());
    for config in configs {
      reports.push(self.upload(artifacts, config, template).await?);
    }
    Ok(reports)
  }

  /// Upload every eligible artifact and extra file to one destination.
  ///
  /// Templates, the bucket URL and the task list are resolved before the
  /// bucket is opened, so configuration errors never leave a connection
  /// behind. Once uploads start, every task runs to completion and the
  /// bucket is closed exactly once.
  #[instrument(
    name = "blob_upload",
    skip(self, artifacts, config, template),
    fields(provider = %config.provider, bucket = %config.bucket)
  )]
  pub async fn upload(
    &self,
    artifacts: &Artifacts,
    config: &BlobConfig,
    template: &dyn Template,
  ) -> Result<UploadReport, UploadError> {
    config.validate()?;

    let folder = template.apply(&config.folder)?;
    let folder = folder.trim_start_matches('/');
    let url = bucket_url(config, template)?;
    let tasks = self.tasks(artifacts, config, template, folder)?;

    info!(
      url = %url,
      folder = %folder,
      tasks = tasks.len(),
      parallelism = self.parallelism,
      "upload_started"
    );

    let driver = Arc::new(BucketDriver::new(self.buckets.clone(), config.acl.clone()));
    if let Err(e) = driver.open(&url).await {
      let _ = driver.close().await;
      let e = classify(e, &url);
      error!(url = %url, error = %e, "upload_failed");
      return Err(UploadError::Open(e));
    }

    let (keys, failures) = self.run(driver.clone(), &tasks, &config.kms_key, &url).await;
    let closed = driver.close().await;
    let total = tasks.len();

    if !failures.is_empty() {
      if let Err(e) = closed {
        error!(url = %url, error = %e, "failed to close bucket");
      }
      error!(
        url = %url,
        failed = failures.len(),
        total,
        "upload_failed"
      );
      return Err(UploadError::Failed { total, failures });
    }

    if let Err(e) = closed {
      let e = classify(e, &url);
      error!(url = %url, error = %e, "upload_failed");
      return Err(UploadError::Close(e));
    }

    info!(url = %url, uploaded = keys.len(), "upload_completed");
    Ok(UploadReport { url, keys })
  }

  fn tasks(
    &self,
    artifacts: &Artifacts,
    config: &BlobConfig,
    template: &dyn Template,
    folder: &str,
  ) -> Result<Vec<UploadTask>, UploadError> {
    let mut tasks: Vec<UploadTask> = artifacts
      .filter(&eligible_filter(config))
      .into_iter()
      .map(|artifact| UploadTask {
        destination: object_key(folder, &artifact.name),
        source: artifact.path,
      })
      .collect();

    for (name, path) in find_extra_files(template, &config.extra_files)? {
      tasks.push(UploadTask {
        destination: object_key(folder, &name),
        source: path,
      });
    }

    Ok(tasks)
  }

  /// Run every task, returning the written keys and the failures.
  async fn run(
    &self,
    driver: Arc<BucketDriver>,
    tasks: &[UploadTask],
    kms_key: &str,
    url: &str,
  ) -> (Vec<String>, Vec<TaskFailure>) {
    let slots = Arc::new(Semaphore::new(self.parallelism));

    let handles: Vec<_> = tasks
      .iter()
      .cloned()
      .map(|task| {
        let slots = slots.clone();
        let driver = driver.clone();
        let encryptor = self.encryptor.clone();
        let kms_key = kms_key.to_string();
        tokio::spawn(async move {
          let _slot = slots
            .acquire_owned()
            .await
            .map_err(|e| TaskError::Aborted {
              message: e.to_string(),
            })?;
          upload_one(driver.as_ref(), &encryptor, &task, &kms_key).await
        })
      })
      .collect();

    let results = futures::future::join_all(handles).await;

    let mut keys = Vec::new();
    let mut failures = Vec::new();
    for (task, result) in tasks.iter().zip(results) {
      let result = result.unwrap_or_else(|e| {
        Err(TaskError::Aborted {
          message: e.to_string(),
        })
      });
      match result {
        Ok(()) => keys.push(task.destination.clone()),
        Err(e) => {
          let error = classify(e, url);
          error!(
            path = %task.source.display(),
            key = %task.destination,
            error = %error,
            "task_failed"
          );
          failures.push(TaskFailure {
            source: task.source.clone(),
            destination: task.destination.clone(),
            error,
          });
        }
      }
    }

    keys.sort();
    (keys, failures)
  }
}

async fn upload_one(
  driver: &dyn Driver,
  encryptor: &ContentEncryptor,
  task: &UploadTask,
  kms_key: &str,
) -> Result<(), TaskError> {
  debug!(path = %task.source.display(), key = %task.destination, "reading");
  let data = tokio::fs::read(&task.source)
    .await
    .map_err(|source| TaskError::Read {
      path: task.source.clone(),
      source,
    })?;
  let data = encryptor.encrypt(data, kms_key).await?;
  driver.upload(&task.destination, Bytes::from(data)).await?;
  Ok(())
}

fn object_key(folder: &str, name: &str) -> String {
  let folder = folder.trim_end_matches('/');
  if folder.is_empty() {
    name.to_string()
  } else {
    format!("{}/{}", folder, name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use stowage_artifact::Artifact;

  #[test]
  fn test_object_key() {
    assert_eq!(object_key("app/v1.0.0", "app.tar.gz"), "app/v1.0.0/app.tar.gz");
    assert_eq!(object_key("app/v1.0.0/", "app.tar.gz"), "app/v1.0.0/app.tar.gz");
    assert_eq!(object_key("", "app.tar.gz"), "app.tar.gz");
  }

  #[test]
  fn test_eligible_filter_kinds() {
    let filter = eligible_filter(&BlobConfig::default());
    for kind in UPLOADABLE_KINDS {
      assert!(filter.matches(&Artifact::new("a", "a", kind)));
    }
    assert!(!filter.matches(&Artifact::new("a", "a", ArtifactKind::Binary)));
    assert!(!filter.matches(&Artifact::new("a", "a", ArtifactKind::DockerImage)));
    assert!(!filter.matches(&Artifact::new("a", "a", ArtifactKind::Metadata)));
  }

  #[test]
  fn test_eligible_filter_ids() {
    let config = BlobConfig {
      ids: vec!["cli".to_string()],
      ..Default::default()
    };
    let filter = eligible_filter(&config);

    let cli = Artifact::new("a", "a", ArtifactKind::UploadableArchive).with_id("cli");
    let server = Artifact::new("b", "b", ArtifactKind::UploadableArchive).with_id("server");
    let checksums = Artifact::new("c", "c", ArtifactKind::Checksum);
    let docker = Artifact::new("d", "d", ArtifactKind::DockerImage).with_id("cli");

    assert!(filter.matches(&cli));
    assert!(!filter.matches(&server));
    assert!(filter.matches(&checksums));
    assert!(!filter.matches(&docker));
  }
}
