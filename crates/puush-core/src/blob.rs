//! On-disk naming convention for file contents.
//!
//! Every component that reads or writes blob bytes goes through
//! [`blob_path`]; the registry and the filesystem must never disagree on where
//! a file lives.

use std::path::{Path, PathBuf};

use crate::file::FileId;

/// The blob's file name inside the root: `"{id}-{filename}"`.
pub fn blob_name(id: &FileId, filename: &str) -> String { format!("{id}-{filename}") }

/// `root` joined with [`blob_name`]. Performs no escaping; filenames are
/// validated by [`Filename::parse`](crate::file::Filename::parse) before they
/// are registered.
pub fn blob_path(root: impl AsRef<Path>, id: &FileId, filename: &str) -> PathBuf {
  root.as_ref().join(blob_name(id, filename))
}
