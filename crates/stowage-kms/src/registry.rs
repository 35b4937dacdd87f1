use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use tracing::debug;

use crate::age_keeper::AgeOpener;
use crate::aws::AwsKmsOpener;
use crate::error::KmsError;
use crate::{Keeper, KeeperOpener};

/// Maps key reference schemes to keeper openers.
#[derive(Clone, Default)]
pub struct KeeperRegistry {
  openers: HashMap<String, Arc<dyn KeeperOpener>>,
}

impl KeeperRegistry {
  /// An empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry with the built-in `age` and `awskms` openers.
  ///
  /// Azure Key Vault (`azurekeyvault://`) and Google Cloud KMS (`gcpkms://`)
  /// references need an opener registered by the application; until then
  /// they fail with [`KmsError::UnsupportedScheme`].
  pub fn with_defaults() -> Self {
    let mut registry = Self::new();
    registry.register("age", Arc::new(AgeOpener));
    registry.register("awskms", Arc::new(AwsKmsOpener));
    registry
  }

  /// Register (or replace) the opener for a scheme.
  pub fn register(&mut self, scheme: impl Into<String>, opener: Arc<dyn KeeperOpener>) {
    self.openers.insert(scheme.into(), opener);
  }

  /// Open the keeper named by `reference`.
  ///
  /// The returned handle releases the keeper when dropped.
  pub async fn open(&self, reference: &str) -> Result<KeeperHandle, KmsError> {
    let opener = reference
      .split_once("://")
      .and_then(|(scheme, _)| self.openers.get(scheme))
      .ok_or_else(|| KmsError::UnsupportedScheme {
        reference: reference.to_string(),
      })?;

    let keeper = opener
      .open(reference)
      .await
      .map_err(|source| KmsError::KeeperUnavailable {
        reference: reference.to_string(),
        source,
      })?;

    debug!(reference = %reference, "keeper opened");
    Ok(KeeperHandle {
      keeper,
      reference: reference.to_string(),
    })
  }
}

/// A keeper that is closed when the handle goes out of scope.
pub struct KeeperHandle {
  keeper: Box<dyn Keeper>,
  reference: String,
}

impl KeeperHandle {
  pub fn reference(&self) -> &str {
    &self.reference
  }
}

impl Deref for KeeperHandle {
  type Target = dyn Keeper;

  fn deref(&self) -> &Self::Target {
    self.keeper.as_ref()
  }
}

impl Drop for KeeperHandle {
  fn drop(&mut self) {
    self.keeper.close();
    debug!(reference = %self.reference, "keeper closed");
  }
}
