//! `POST /api/upload` — store the multipart field `file` and answer with its
//! share URL.
//!
//! Order of operations: stream bytes into a pending blob, register the file
//! (under the configured timeout), then move the blob into place. Any failure
//! before the move discards the pending blob, so no row is left pointing at
//! missing bytes unless the process dies between the last two steps.
//!
//! Registration runs in its own task. A timeout only stops the handler from
//! waiting; the registration still finishes in the background and, if it
//! succeeded, is undone by [`unregister_late`].

use std::sync::Arc;

use axum::{
  extract::{
    Multipart, State,
    multipart::{Field, MultipartError},
  },
  http::{HeaderMap, StatusCode, header},
};
use puush_core::{
  file::{FileId, Filename},
  registry::FileRegistry,
  session::SessionKey,
};
use tokio::task::JoinHandle;

use crate::{
  AppState,
  blob::PendingBlob,
  error::Error,
  session::SessionCookie,
};

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  SessionCookie(session): SessionCookie,
  headers: HeaderMap,
  mut multipart: Multipart,
) -> Result<String, Error>
where
  S: FileRegistry + Clone + Send + Sync + 'static,
{
  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(multipart_error)?
  {
    if field.name() != Some("file") {
      continue;
    }

    let filename = Filename::parse(field.file_name().unwrap_or_default())?;

    let mut pending = state.blobs.begin().await?;
    if let Err(e) = stream_into(field, &mut pending).await {
      pending.discard().await;
      return Err(e);
    }

    let mut registering = tokio::spawn({
      let registry = state.registry.clone();
      let filename = filename.clone();
      async move { registry.register_file(session, filename).await }
    });

    let id = match tokio::time::timeout(state.config.register_timeout(), &mut registering).await {
      Ok(Ok(Ok(id))) => id,
      Ok(Ok(Err(e))) => {
        pending.discard().await;
        return Err(Error::registry(e));
      }
      Ok(Err(e)) => {
        pending.discard().await;
        return Err(e.into());
      }
      Err(_) => {
        pending.discard().await;
        tokio::spawn(unregister_late(state.registry.clone(), session, registering));
        return Err(Error::Timeout);
      }
    };

    let dest = state.blobs.path(&id, filename.as_str());
    let written = match pending.commit(&dest).await {
      Ok(n) => n,
      Err(e) => {
        // Roll the registration back so the id does not dangle.
        if let Err(undo) = state.registry.delete_file(session, id.clone()).await {
          tracing::error!(%id, error = %undo, "failed to unregister file after blob error");
        }
        return Err(e.into());
      }
    };

    tracing::info!(%id, %session, bytes = written, path = %dest.display(), "stored upload");
    return Ok(share_url(&headers, &id, filename.extension()));
  }

  Err(Error::BadRequest("missing multipart field \"file\"".to_string()))
}

async fn stream_into(mut field: Field<'_>, pending: &mut PendingBlob) -> Result<(), Error> {
  while let Some(chunk) = field
    .chunk()
    .await
    .map_err(multipart_error)?
  {
    pending.write(&chunk).await?;
  }
  Ok(())
}

fn multipart_error(e: MultipartError) -> Error {
  if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
    Error::PayloadTooLarge
  } else {
    Error::BadRequest(format!("upload interrupted: {e}"))
  }
}

/// Wait out a registration the handler gave up on and remove the row it
/// created, since its blob was already discarded.
async fn unregister_late<S>(
  registry: Arc<S>,
  session: SessionKey,
  registering: JoinHandle<Result<FileId, S::Error>>,
) where
  S: FileRegistry + 'static,
{
  let Ok(Ok(id)) = registering.await else { return };
  match registry.delete_file(session, id.clone()).await {
    Ok(_) => tracing::warn!(%id, %session, "unregistered file whose registration outlived the timeout"),
    Err(e) => tracing::error!(%id, %session, error = %e, "failed to unregister timed-out file"),
  }
}

/// `{proto://}{host}/{id}{ext}`; the scheme is only known when a proxy sent
/// `Forwarded: proto=...`.
pub fn share_url(headers: &HeaderMap, id: &FileId, extension: &str) -> String {
  let host = headers
    .get(header::HOST)
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default();

  let protocol = headers
    .get_all(header::FORWARDED)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split([';', ',']))
    .filter_map(|pair| pair.trim().split_once('='))
    .filter(|(k, _)| k.eq_ignore_ascii_case("proto"))
    .map(|(_, v)| v.trim_matches('"'))
    .filter(|v| *v == "http" || *v == "https")
    .last()
    .map(|proto| format!("{proto}://"))
    .unwrap_or_default();

  format!("{protocol}{host}/{id}{extension}")
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  fn id() -> FileId { FileId::parse("a1b").unwrap() }

  #[test]
  fn url_without_forwarded_has_no_scheme() {
    let mut h = HeaderMap::new();
    h.insert(header::HOST, HeaderValue::from_static("puush.example"));
    assert_eq!(share_url(&h, &id(), ".png"), "puush.example/a1b.png");
  }

  #[test]
  fn url_uses_forwarded_proto() {
    let mut h = HeaderMap::new();
    h.insert(header::HOST, HeaderValue::from_static("puush.example"));
    h.insert(header::FORWARDED, HeaderValue::from_static("for=10.0.0.1;proto=https;by=proxy"));
    assert_eq!(share_url(&h, &id(), ""), "https://puush.example/a1b");
  }

  #[test]
  fn url_ignores_unknown_proto() {
    let mut h = HeaderMap::new();
    h.insert(header::HOST, HeaderValue::from_static("h"));
    h.insert(header::FORWARDED, HeaderValue::from_static("proto=gopher"));
    assert_eq!(share_url(&h, &id(), ".txt"), "h/a1b.txt");
  }
}
