//! Error types and axum `IntoResponse` implementation.
//!
//! Clients only ever see "bad request", "unauthorized", "not found",
//! "payload too large" or a generic internal error; storage and filesystem detail goes to the log.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("missing session key cookie")]
  MissingSession,
  #[error("invalid session key cookie")]
  Unauthorized,
  #[error("file not found")]
  NotFound,
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("upload exceeds the size limit")]
  PayloadTooLarge,
  #[error("file registration timed out")]
  Timeout,
  #[error("registration task failed: {0}")]
  Task(#[from] tokio::task::JoinError),
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("registry error: {0}")]
  Registry(#[source] puush_core::Error),
}

impl Error {
  /// Convert any backend error through the core taxonomy.
  pub fn registry<E: Into<puush_core::Error>>(e: E) -> Self { Self::from(e.into()) }
}

impl From<puush_core::Error> for Error {
  fn from(e: puush_core::Error) -> Self {
    use puush_core::Error as Core;
    match e {
      Core::SessionNotFound(_) | Core::InvalidSessionKey(_) => Error::Unauthorized,
      Core::FileNotFound(_) | Core::InvalidFileId(_) => Error::NotFound,
      Core::InvalidFilename { .. } => Error::BadRequest(e.to_string()),
      Core::StorageUnavailable(_) => Error::Registry(e),
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::MissingSession => {
        (StatusCode::BAD_REQUEST, "Missing session key cookie").into_response()
      }
      Error::Unauthorized => {
        (StatusCode::UNAUTHORIZED, "Invalid session key cookie").into_response()
      }
      Error::NotFound => (StatusCode::NOT_FOUND, "File not found").into_response(),
      Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
      Error::PayloadTooLarge => {
        (StatusCode::PAYLOAD_TOO_LARGE, "Upload too large").into_response()
      }
      Error::Timeout | Error::Task(_) | Error::Io(_) | Error::Registry(_) => {
        tracing::error!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
      }
    }
  }
}
