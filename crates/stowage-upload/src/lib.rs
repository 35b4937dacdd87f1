//! Stowage Upload
//!
//! Uploads a release's artifacts to blob storage.
//!
//! For each blob destination the [`BlobUploader`] resolves every template up
//! front, selects the eligible artifacts and extra files, then uploads them
//! through a single driver with bounded parallelism. A failing file does not
//! stop the others; the run fails afterwards with every classified error.

mod error;
mod extra_files;
mod uploader;

pub use error::{ExtraFilesError, TaskError, TaskFailure, UploadError};
pub use extra_files::find_extra_files;
pub use uploader::{BlobUploader, UploadReport, UploadTask, eligible_filter};
