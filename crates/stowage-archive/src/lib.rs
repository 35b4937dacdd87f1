//! Stowage Archive
//!
//! Builds tar archives from an explicit list of filesystem objects. Each
//! [`FileEntry`] becomes exactly one record: directories are not walked, so
//! callers submit one entry per file, directory or symlink, parents first.
//!
//! Header metadata comes from the entry's [`FileInfo`] override when set and
//! from the filesystem otherwise. Numeric owner and group IDs are always 0;
//! only the names from the override are recorded.

mod error;
mod tar_archive;

pub use error::ArchiveError;
pub use stowage_config::{FileEntry, FileInfo};
pub use tar_archive::TarArchive;
