//! On-disk blob storage under a single root directory.
//!
//! Uploads are written in two phases: bytes land in a `.pending-<uuid>` file,
//! the registry row is inserted, and only then is the pending file renamed
//! to its final [`blob_path`]. A crash mid-upload leaves at most a pending
//! file, which [`BlobStore::sweep_pending`] removes at startup.

use std::{
  io,
  path::{Path, PathBuf},
};

use puush_core::{blob::blob_path, file::FileId};
use tokio::{fs, io::AsyncWriteExt as _};
use uuid::Uuid;

const PENDING_PREFIX: &str = ".pending-";

#[derive(Debug, Clone)]
pub struct BlobStore {
  root: PathBuf,
}

impl BlobStore {
  /// Use `root` as blob directory, creating it if needed.
  ///
  /// Fails if `root` exists but is not a directory.
  pub async fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
    let root = root.into();
    match fs::metadata(&root).await {
      Ok(meta) if meta.is_dir() => {}
      Ok(_) => {
        return Err(io::Error::new(
          io::ErrorKind::AlreadyExists,
          format!("blob root {} is not a directory", root.display()),
        ));
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        tracing::info!(root = %root.display(), "creating blob directory");
        fs::create_dir_all(&root).await?;
      }
      Err(e) => return Err(e),
    }
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path { &self.root }

  /// Where the bytes of file `id` named `filename` live.
  pub fn path(&self, id: &FileId, filename: &str) -> PathBuf { blob_path(&self.root, id, filename) }

  /// Start a new upload.
  pub async fn begin(&self) -> io::Result<PendingBlob> {
    let path = self.root.join(format!("{PENDING_PREFIX}{}", Uuid::new_v4().simple()));
    let file = fs::File::create_new(&path).await?;
    Ok(PendingBlob { path, file, written: 0 })
  }

  /// Size of a stored blob, or `None` if it is missing.
  pub async fn size(&self, id: &FileId, filename: &str) -> io::Result<Option<u64>> {
    match fs::metadata(self.path(id, filename)).await {
      Ok(meta) => Ok(Some(meta.len())),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e),
    }
  }

  /// Delete a stored blob. Returns `false` if it was already gone.
  pub async fn remove(&self, id: &FileId, filename: &str) -> io::Result<bool> {
    match fs::remove_file(self.path(id, filename)).await {
      Ok(()) => Ok(true),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
      Err(e) => Err(e),
    }
  }

  /// Delete pending files left behind by interrupted uploads.
  ///
  /// Only call this before the server accepts requests; it cannot tell an
  /// abandoned upload from one in flight.
  pub async fn sweep_pending(&self) -> io::Result<usize> {
    let mut removed = 0;
    let mut entries = fs::read_dir(&self.root).await?;
    while let Some(entry) = entries.next_entry().await? {
      if entry.file_name().to_string_lossy().starts_with(PENDING_PREFIX) {
        fs::remove_file(entry.path()).await?;
        removed += 1;
      }
    }
    Ok(removed)
  }
}

/// An upload in progress.
#[derive(Debug)]
pub struct PendingBlob {
  path:    PathBuf,
  file:    fs::File,
  written: u64,
}

impl PendingBlob {
  pub async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
    self.file.write_all(chunk).await?;
    self.written += chunk.len() as u64;
    Ok(())
  }

  pub fn written(&self) -> u64 { self.written }

  /// Flush to disk and move into place at `dest`. Returns the byte count.
  pub async fn commit(mut self, dest: &Path) -> io::Result<u64> {
    self.file.flush().await?;
    self.file.sync_all().await?;
    drop(self.file);
    if let Err(e) = fs::rename(&self.path, dest).await {
      let _ = fs::remove_file(&self.path).await;
      return Err(e);
    }
    Ok(self.written)
  }

  /// Abandon the upload and delete what was written.
  pub async fn discard(self) {
    drop(self.file);
    if let Err(e) = fs::remove_file(&self.path).await {
      tracing::warn!(path = %self.path.display(), error = %e, "failed to remove pending blob");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn id(s: &str) -> FileId { FileId::parse(s).unwrap() }

  #[tokio::test]
  async fn open_creates_missing_root() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("nested/blobs");
    let store = BlobStore::open(&root).await.unwrap();
    assert!(store.root().is_dir());
  }

  #[tokio::test]
  async fn open_rejects_a_regular_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("not-a-dir");
    std::fs::write(&file, b"x").unwrap();
    assert!(BlobStore::open(&file).await.is_err());
  }

  #[tokio::test]
  async fn committed_blob_lands_at_blob_path() {
    let temp = TempDir::new().unwrap();
    let store = BlobStore::open(temp.path()).await.unwrap();

    let mut pending = store.begin().await.unwrap();
    pending.write(b"hello ").await.unwrap();
    pending.write(b"world").await.unwrap();
    assert_eq!(pending.written(), 11);

    let dest = store.path(&id("a1b"), "cat.txt");
    assert_eq!(pending.commit(&dest).await.unwrap(), 11);

    assert_eq!(dest, temp.path().join("a1b-cat.txt"));
    assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
    assert_eq!(store.size(&id("a1b"), "cat.txt").await.unwrap(), Some(11));
    assert_eq!(store.sweep_pending().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn discarded_blob_leaves_nothing() {
    let temp = TempDir::new().unwrap();
    let store = BlobStore::open(temp.path()).await.unwrap();

    let mut pending = store.begin().await.unwrap();
    pending.write(b"abandoned").await.unwrap();
    pending.discard().await;

    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
  }

  #[tokio::test]
  async fn sweep_removes_only_pending_files() {
    let temp = TempDir::new().unwrap();
    let store = BlobStore::open(temp.path()).await.unwrap();

    std::fs::write(temp.path().join(".pending-deadbeef"), b"x").unwrap();
    std::fs::write(temp.path().join("abc-keep.txt"), b"y").unwrap();

    assert_eq!(store.sweep_pending().await.unwrap(), 1);
    assert!(temp.path().join("abc-keep.txt").exists());
    assert!(!temp.path().join(".pending-deadbeef").exists());
  }

  #[tokio::test]
  async fn remove_and_size_tolerate_missing_blobs() {
    let temp = TempDir::new().unwrap();
    let store = BlobStore::open(temp.path()).await.unwrap();
    assert_eq!(store.size(&id("xyz"), "gone").await.unwrap(), None);
    assert!(!store.remove(&id("xyz"), "gone").await.unwrap());
  }
}
