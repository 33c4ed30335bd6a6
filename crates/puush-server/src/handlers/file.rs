//! `GET /{id}[.ext]` (public) and `DELETE /{id}[.ext]` (owner only).

use axum::{
  body::Body,
  extract::{Path, Request, State},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use puush_core::{file::FileId, registry::FileRegistry};
use tower::ServiceExt as _;
use tower_http::services::ServeFile;

use crate::{AppState, error::Error, session::SessionCookie};

/// Drop the trailing extension of a share-URL segment: `a1b.png` → `a1b`.
/// Anything that is not a well-formed id is simply not found.
pub fn parse_segment(segment: &str) -> Result<FileId, Error> {
  let stem = match segment.rfind('.') {
    Some(i) => &segment[..i],
    None => segment,
  };
  FileId::parse(stem).map_err(|_| Error::NotFound)
}

fn content_disposition(filename: &str) -> Option<HeaderValue> {
  let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
  HeaderValue::from_bytes(format!("inline; filename=\"{escaped}\"").as_bytes()).ok()
}

/// Serve a blob to anyone holding its id.
pub async fn get<S>(
  State(state): State<AppState<S>>,
  Path(segment): Path<String>,
  req: Request,
) -> Result<Response, Error>
where
  S: FileRegistry + Clone + Send + Sync + 'static,
{
  let id = parse_segment(&segment)?;

  let filename = state
    .registry
    .lookup_file(id.clone(), None)
    .await
    .map_err(Error::registry)?
    .ok_or(Error::NotFound)?;

  let path = state.blobs.path(&id, &filename);
  if state.blobs.size(&id, &filename).await?.is_none() {
    tracing::warn!(%id, path = %path.display(), "registered file has no blob");
    return Err(Error::NotFound);
  }

  let mut res = match ServeFile::new(&path).oneshot(req).await {
    Ok(res) => res.map(Body::new),
    Err(never) => match never {},
  };

  if res.status().is_success()
    && let Some(value) = content_disposition(&filename)
  {
    res.headers_mut().insert(header::CONTENT_DISPOSITION, value);
  }
  Ok(res)
}

/// Delete a file owned by the caller, registry row first, then the blob.
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  SessionCookie(session): SessionCookie,
  Path(segment): Path<String>,
) -> Result<Response, Error>
where
  S: FileRegistry + Clone + Send + Sync + 'static,
{
  let id = parse_segment(&segment)?;

  let filename = state
    .registry
    .delete_file(session, id.clone())
    .await
    .map_err(Error::registry)?;

  if !state.blobs.remove(&id, &filename).await? {
    tracing::warn!(%id, "deleted file had no blob");
  }

  tracing::info!(%id, %session, "deleted file");
  Ok(StatusCode::OK.into_response())
}
