//! Upload error types.

use std::fmt;
use std::path::PathBuf;

use stowage_blob::{BlobError, ClassifiedError};
use stowage_config::ConfigError;
use stowage_kms::KmsError;
use stowage_template::TemplateError;
use thiserror::Error;

/// Errors raised while resolving extra file patterns.
#[derive(Debug, Error)]
pub enum ExtraFilesError {
  #[error(transparent)]
  Template(#[from] TemplateError),

  #[error("invalid extra file glob '{pattern}': {source}")]
  InvalidGlob {
    pattern: String,
    #[source]
    source: globset::Error,
  },

  #[error("failed to walk extra files for '{pattern}': {source}")]
  Walk {
    pattern: String,
    #[source]
    source: walkdir::Error,
  },

  /// A name template can only rename a single file.
  #[error("globbing '{pattern}' with a name template matched {count} files, expected 1")]
  MultipleMatches { pattern: String, count: usize },
}

/// Why a single upload task failed, before classification.
#[derive(Debug, Error)]
pub enum TaskError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Encrypt(#[from] KmsError),

  #[error(transparent)]
  Upload(#[from] BlobError),

  /// The task did not run to completion.
  #[error("upload task aborted: {message}")]
  Aborted { message: String },
}

/// A failed upload task and its classified error.
#[derive(Debug)]
pub struct TaskFailure {
  pub source: PathBuf,
  pub destination: String,
  pub error: ClassifiedError,
}

impl fmt::Display for TaskFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.destination, self.error)
  }
}

/// Errors raised by a blob upload run.
#[derive(Debug, Error)]
pub enum UploadError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Template(#[from] TemplateError),

  #[error(transparent)]
  Destination(#[from] BlobError),

  #[error(transparent)]
  ExtraFiles(#[from] ExtraFilesError),

  /// The bucket could not be opened; no task ran.
  #[error(transparent)]
  Open(ClassifiedError),

  /// One or more upload tasks failed. Every failure is listed.
  #[error("{} of {total} uploads failed:\n{}", .failures.len(), list(.failures))]
  Failed {
    total: usize,
    failures: Vec<TaskFailure>,
  },

  /// Every task succeeded but the bucket could not be closed.
  #[error(transparent)]
  Close(ClassifiedError),
}

fn list(failures: &[TaskFailure]) -> String {
  failures
    .iter()
    .map(|f| format!("  {}", f))
    .collect::<Vec<_>>()
    .join("\n")
}
