//! Error types for `puush-core`.

use thiserror::Error;

use crate::{file::FileId, session::SessionKey};

#[derive(Debug, Error)]
pub enum Error {
  #[error("session not found: {0}")]
  SessionNotFound(SessionKey),

  #[error("file not found: {0}")]
  FileNotFound(FileId),

  #[error("invalid session key: {0:?}")]
  InvalidSessionKey(String),

  #[error("invalid file id: {0:?}")]
  InvalidFileId(String),

  #[error("invalid filename {name:?}: {reason}")]
  InvalidFilename { name: String, reason: &'static str },

  /// The backing store failed or is unreachable. Never carries detail that
  /// should reach an end user; callers log it and answer with a generic
  /// internal error.
  #[error("storage unavailable: {0}")]
  StorageUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// `true` for outcomes that are a normal "no such thing" answer rather than
  /// a fault.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::FileNotFound(_) | Self::SessionNotFound(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
