//! HTTP layer of the puush file host.
//!
//! Exposes an axum [`Router`] backed by any [`FileRegistry`] and a
//! [`BlobStore`] directory.
//!
//! | Method   | Path           | Session | Notes |
//! |----------|----------------|---------|-------|
//! | `GET`    | `/api/session` | no      | new session key as plain text |
//! | `POST`   | `/api/upload`  | yes     | multipart field `file`; returns the share URL |
//! | `GET`    | `/api/list`    | yes     | JSON listing of the caller's files |
//! | `GET`    | `/{id}[.ext]`  | no      | file contents, served inline |
//! | `DELETE` | `/{id}[.ext]`  | yes     | remove an owned file |

pub mod blob;
pub mod error;
pub mod handlers;
pub mod session;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use puush_core::registry::FileRegistry;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use blob::BlobStore;
use handlers::{file, list, session as session_handler, upload};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `PUUSH_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                  String,
  pub port:                  u16,
  /// Directory holding the uploaded blobs.
  pub root_directory:        PathBuf,
  pub database_path:         PathBuf,
  pub max_upload_bytes:      usize,
  /// Upper bound on one file registration, id allocation included.
  pub register_timeout_secs: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                  "0.0.0.0".to_string(),
      port:                  8080,
      root_directory:        PathBuf::from("/srv/puush"),
      database_path:         PathBuf::from("puush.db"),
      max_upload_bytes:      64 * 1024 * 1024,
      register_timeout_secs: 10,
    }
  }
}

impl ServerConfig {
  pub fn register_timeout(&self) -> Duration { Duration::from_secs(self.register_timeout_secs) }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: FileRegistry> {
  pub registry: Arc<S>,
  pub blobs:    Arc<BlobStore>,
  pub config:   Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] for the file host.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: FileRegistry + Clone + Send + Sync + 'static,
{
  let body_limit = state.config.max_upload_bytes;

  Router::new()
    .route("/api/session", get(session_handler::create::<S>))
    .route("/api/upload",  post(upload::handler::<S>))
    .route("/api/list",    get(list::handler::<S>))
    .route("/{file}",      get(file::get::<S>).delete(file::delete::<S>))
    .layer(DefaultBodyLimit::max(body_limit))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
