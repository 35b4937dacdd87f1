//! Archive error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
  /// The archive was already closed.
  #[error("archive is closed")]
  ArchiveClosed,

  /// The entry's source does not exist.
  #[error("source not found: {}", path.display())]
  SourceNotFound { path: PathBuf },

  /// The source is neither a regular file, a directory nor a symlink.
  #[error("unsupported file type for {}", path.display())]
  UnsupportedEntry { path: PathBuf },

  /// The override modification time is before 1970.
  #[error("modification time for {} is before the unix epoch", path.display())]
  InvalidMtime { path: PathBuf },

  /// Reading the source or writing the archive failed.
  #[error("failed to archive {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// Flushing the archive trailer failed.
  #[error("failed to finish archive: {0}")]
  Finish(#[source] std::io::Error),
}
