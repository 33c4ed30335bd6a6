//! `GET /api/session` — hand out a fresh anonymous session key.

use axum::extract::State;
use puush_core::registry::FileRegistry;

use crate::{AppState, error::Error};

/// Responds with the new key as plain text.
pub async fn create<S>(State(state): State<AppState<S>>) -> Result<String, Error>
where
  S: FileRegistry + Clone + Send + Sync + 'static,
{
  let session = state
    .registry
    .create_session()
    .await
    .map_err(Error::registry)?;

  tracing::info!(session = %session.key, "created session");
  Ok(session.key.to_string())
}
