//! The `FileRegistry` trait.
//!
//! The trait is implemented by storage backends (e.g. `puush-store-sqlite`).
//! The HTTP layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  file::{FileId, FileRecord, Filename},
  session::{Session, SessionKey},
};

/// Abstraction over the session store and file registry.
///
/// Sessions are immutable once created. File ids are globally unique even
/// under concurrent registration; backends guarantee this with an atomic
/// claim rather than an existence check followed by an insert.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait FileRegistry: Send + Sync {
  /// Backend error. Converts into the core [`Error`](crate::Error) so callers
  /// can tell "not found" apart from storage faults without knowing the
  /// backend.
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Create and persist a new session with a fresh random key.
  fn create_session(&self) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// Whether a session with this key is currently persisted.
  fn session_exists(
    &self,
    key: SessionKey,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Remove a session and, by cascade, every file it owns.
  ///
  /// Returns the removed file records so the caller can drop their blobs.
  /// Not reachable over HTTP; intended for an expiry sweep.
  fn delete_session(
    &self,
    key: SessionKey,
  ) -> impl Future<Output = Result<Vec<FileRecord>, Self::Error>> + Send + '_;

  // ── Files ─────────────────────────────────────────────────────────────

  /// Allocate a fresh id and register `filename` under `session`.
  ///
  /// Fails with `SessionNotFound` if the session does not exist.
  fn register_file(
    &self,
    session: SessionKey,
    filename: Filename,
  ) -> impl Future<Output = Result<FileId, Self::Error>> + Send + '_;

  /// Resolve an id to its filename.
  ///
  /// With `session` set, the file must also be owned by that session.
  /// Returns `None` when nothing matches.
  fn lookup_file(
    &self,
    id: FileId,
    session: Option<SessionKey>,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  /// Remove a file owned by `session` and return its filename.
  ///
  /// Fails with `FileNotFound` if no such file is owned by the session,
  /// including when a concurrent delete got there first.
  fn delete_file(
    &self,
    session: SessionKey,
    id: FileId,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  /// All files owned by `session`, in insertion order.
  fn list_files(
    &self,
    session: SessionKey,
  ) -> impl Future<Output = Result<Vec<FileRecord>, Self::Error>> + Send + '_;
}
