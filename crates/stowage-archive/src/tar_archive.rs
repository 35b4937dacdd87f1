use std::fs::{self, File, Metadata};
use std::io::{self, Write};
use std::path::Path;
use std::time::UNIX_EPOCH;

use stowage_config::{FileEntry, FileInfo};
use tar::{Builder, EntryType, Header};
use tracing::debug;

use crate::error::ArchiveError;

/// A tar archive writer.
///
/// The archive starts open and accepts entries until [`TarArchive::close`]
/// is called. Closing writes the end-of-archive trailer and drops the
/// underlying writer. A single archive must only be driven from one place at
/// a time; `&mut self` on every operation enforces that.
pub struct TarArchive<W: Write> {
  builder: Option<Builder<W>>,
}

/// Header fields after applying the override on top of the filesystem.
struct Resolved {
  mode: u32,
  mtime: u64,
  owner: Option<String>,
  group: Option<String>,
}

impl<W: Write> TarArchive<W> {
  /// Start a new archive writing into `writer`.
  pub fn new(writer: W) -> Self {
    Self {
      builder: Some(Builder::new(writer)),
    }
  }

  /// Whether the archive has been closed.
  pub fn is_closed(&self) -> bool {
    self.builder.is_none()
  }

  /// Append one entry.
  ///
  /// An entry rejected because the archive is closed or the source is
  /// missing writes nothing, so the archive stays usable.
  pub fn add(&mut self, entry: &FileEntry) -> Result<(), ArchiveError> {
    let builder = self.builder.as_mut().ok_or(ArchiveError::ArchiveClosed)?;

    let source = entry.source.as_path();
    let metadata = fs::symlink_metadata(source).map_err(|e| {
      if e.kind() == io::ErrorKind::NotFound {
        ArchiveError::SourceNotFound {
          path: source.to_path_buf(),
        }
      } else {
        io_error(source, e)
      }
    })?;

    let resolved = resolve(&metadata, entry.info.as_ref()).ok_or_else(|| {
      ArchiveError::InvalidMtime {
        path: source.to_path_buf(),
      }
    })?;

    debug!(
      source = %source.display(),
      destination = %entry.destination,
      mode = %format_args!("{:o}", resolved.mode),
      "adding archive entry"
    );

    let file_type = metadata.file_type();
    if !(file_type.is_symlink() || file_type.is_dir() || file_type.is_file()) {
      return Err(ArchiveError::UnsupportedEntry {
        path: source.to_path_buf(),
      });
    }

    append(builder, entry, &metadata, &resolved).map_err(|e| io_error(source, e))
  }

  /// Write the trailer and close the underlying writer.
  ///
  /// Closing an already closed archive does nothing.
  pub fn close(&mut self) -> Result<(), ArchiveError> {
    let Some(builder) = self.builder.take() else {
      return Ok(());
    };
    let mut writer = builder.into_inner().map_err(ArchiveError::Finish)?;
    writer.flush().map_err(ArchiveError::Finish)?;
    drop(writer);
    Ok(())
  }
}

fn io_error(path: &Path, source: io::Error) -> ArchiveError {
  ArchiveError::Io {
    path: path.to_path_buf(),
    source,
  }
}

fn append<W: Write>(
  builder: &mut Builder<W>,
  entry: &FileEntry,
  metadata: &Metadata,
  resolved: &Resolved,
) -> io::Result<()> {
  let source = entry.source.as_path();
  let file_type = metadata.file_type();

  if file_type.is_symlink() {
    // Targets are recorded verbatim; a dangling link is still a valid entry.
    let target = fs::read_link(source)?;
    let mut header = new_header(EntryType::Symlink, 0, resolved)?;
    builder.append_link(&mut header, &entry.destination, &target)
  } else if file_type.is_dir() {
    let mut header = new_header(EntryType::Directory, 0, resolved)?;
    builder.append_data(&mut header, &entry.destination, io::empty())
  } else {
    let file = File::open(source)?;
    let mut header = new_header(EntryType::Regular, metadata.len(), resolved)?;
    builder.append_data(&mut header, &entry.destination, file)
  }
}

fn new_header(kind: EntryType, size: u64, resolved: &Resolved) -> io::Result<Header> {
  let mut header = Header::new_gnu();
  header.set_entry_type(kind);
  header.set_size(size);
  header.set_mode(resolved.mode);
  header.set_mtime(resolved.mtime);
  header.set_uid(0);
  header.set_gid(0);
  if let Some(owner) = &resolved.owner {
    header.set_username(owner)?;
  }
  if let Some(group) = &resolved.group {
    header.set_groupname(group)?;
  }
  Ok(header)
}

/// `None` when the override mtime predates the epoch, which a tar header
/// cannot record.
fn resolve(metadata: &Metadata, info: Option<&FileInfo>) -> Option<Resolved> {
  let info = info.cloned().unwrap_or_default();
  let mtime = match info.mtime {
    Some(mtime) => u64::try_from(mtime.timestamp()).ok()?,
    None => fs_mtime(metadata),
  };
  Some(Resolved {
    mode: info.mode.unwrap_or_else(|| fs_mode(metadata)),
    mtime,
    owner: info.owner.filter(|o| !o.is_empty()),
    group: info.group.filter(|g| !g.is_empty()),
  })
}

#[cfg(unix)]
fn fs_mode(metadata: &Metadata) -> u32 {
  use std::os::unix::fs::PermissionsExt;
  metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn fs_mode(metadata: &Metadata) -> u32 {
  if metadata.is_dir() || metadata.file_type().is_symlink() {
    0o755
  } else if metadata.permissions().readonly() {
    0o444
  } else {
    0o644
  }
}

fn fs_mtime(metadata: &Metadata) -> u64 {
  metadata
    .modified()
    .ok()
    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
    .map(|d| d.as_secs())
    .unwrap_or(0)
}
