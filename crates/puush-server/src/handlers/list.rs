//! `GET /api/list` — the caller's uploads with their on-disk sizes.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use puush_core::{file::FileId, registry::FileRegistry};
use serde::Serialize;

use crate::{AppState, error::Error, session::SessionCookie};

/// One entry of the listing.
#[derive(Debug, Serialize)]
pub struct ListedFile {
  pub id:          FileId,
  pub name:        String,
  pub since:       DateTime<Utc>,
  /// `None` when the registry row has no blob (an interrupted upload).
  pub size:        Option<u64>,
  pub size_pretty: Option<String>,
}

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  SessionCookie(session): SessionCookie,
) -> Result<Json<Vec<ListedFile>>, Error>
where
  S: FileRegistry + Clone + Send + Sync + 'static,
{
  let records = state
    .registry
    .list_files(session)
    .await
    .map_err(Error::registry)?;

  let mut listed = Vec::with_capacity(records.len());
  for record in records {
    let size = state.blobs.size(&record.id, &record.filename).await?;
    if size.is_none() {
      tracing::warn!(id = %record.id, "registered file has no blob");
    }
    listed.push(ListedFile {
      id:          record.id,
      name:        record.filename,
      since:       record.since,
      size,
      size_pretty: size.map(pretty_size),
    });
  }

  Ok(Json(listed))
}

/// Human-readable size in SI units, e.g. `"1.5 kB"`.
pub fn pretty_size(bytes: u64) -> String {
  const UNIT: u64 = 1000;
  if bytes < UNIT {
    return format!("{bytes} B");
  }

  let mut div = UNIT;
  let mut exp = 0;
  let mut n = bytes / UNIT;
  while n >= UNIT {
    div *= UNIT;
    exp += 1;
    n /= UNIT;
  }

  let prefix = ['k', 'M', 'G', 'T', 'P', 'E'][exp];
  format!("{:.1} {prefix}B", bytes as f64 / div as f64)
}
