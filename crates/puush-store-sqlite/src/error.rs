//! Error type for `puush-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] puush_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored row no longer satisfies the core type invariants.
  #[error("corrupt row: {0}")]
  Corrupt(String),
}

impl From<Error> for puush_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(core) => core,
      other => puush_core::Error::StorageUnavailable(Box::new(other)),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
