use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::destination::{Destination, Provider};
use crate::error::BoxError;
use crate::options::WriteOptions;
use crate::{Bucket, BucketOpener};

/// Filesystem-backed bucket.
///
/// Each object is stored at `{root}/{key}`. Parent directories are created
/// automatically. Objects are written to a temporary sibling and renamed into
/// place, so readers never observe a partial object.
pub struct FsBucket {
  root: PathBuf,
}

impl FsBucket {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  fn key_to_path(&self, key: &str) -> Result<PathBuf, BoxError> {
    let relative = Path::new(key);
    let escapes = relative
      .components()
      .any(|c| !matches!(c, Component::Normal(_)));
    if key.is_empty() || escapes {
      return Err(format!("invalid object key: {}", key).into());
    }
    Ok(self.root.join(relative))
  }
}

#[async_trait]
impl Bucket for FsBucket {
  fn provider(&self) -> Provider {
    Provider::File
  }

  async fn write(&self, key: &str, data: Bytes, _options: &WriteOptions) -> Result<(), BoxError> {
    let path = self.key_to_path(key)?;
    let parent = path.parent().unwrap_or(&self.root);
    fs::create_dir_all(parent).await?;

    let file_name = path
      .file_name()
      .map(|n| n.to_string_lossy().to_string())
      .unwrap_or_default();
    let temp = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    let written = async {
      let mut file = File::create(&temp).await?;
      file.write_all(&data).await?;
      file.sync_all().await?;
      fs::rename(&temp, &path).await
    }
    .await;

    if let Err(e) = written {
      let _ = fs::remove_file(&temp).await;
      return Err(e.into());
    }
    Ok(())
  }
}

/// Opens `file://<directory>` buckets. The directory must exist.
pub struct FsOpener;

#[async_trait]
impl BucketOpener for FsOpener {
  async fn open(&self, destination: &Destination) -> Result<Arc<dyn Bucket>, BoxError> {
    let root = PathBuf::from(destination.bucket());
    let metadata = fs::metadata(&root)
      .await
      .map_err(|e| format!("{}: {}", root.display(), e))?;
    if !metadata.is_dir() {
      return Err(format!("{} is not a directory", root.display()).into());
    }
    Ok(Arc::new(FsBucket::new(root)))
  }
}
