//! `SESSION_KEY` cookie extractor.
//!
//! A handler that takes [`SessionCookie`] only runs for requests carrying the
//! key of a session that currently exists.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use puush_core::{registry::FileRegistry, session::SessionKey};

use crate::{AppState, error::Error};

/// Name of the cookie carrying the session key.
pub const SESSION_COOKIE: &str = "SESSION_KEY";

/// Verified session key of the caller.
#[derive(Debug, Clone, Copy)]
pub struct SessionCookie(pub SessionKey);

/// Find a cookie by name across all `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(k, _)| *k == name)
    .map(|(_, v)| v.trim_matches('"'))
}

/// Resolve the session cookie against the registry.
pub async fn verify_session<S>(headers: &HeaderMap, state: &AppState<S>) -> Result<SessionKey, Error>
where
  S: FileRegistry + Clone + Send + Sync + 'static,
{
  let raw = cookie_value(headers, SESSION_COOKIE).ok_or(Error::MissingSession)?;
  let key: SessionKey = raw.parse().map_err(|_| Error::Unauthorized)?;

  let exists = state
    .registry
    .session_exists(key)
    .await
    .map_err(Error::registry)?;

  if exists { Ok(key) } else { Err(Error::Unauthorized) }
}

impl<S> FromRequestParts<AppState<S>> for SessionCookie
where
  S: FileRegistry + Clone + Send + Sync + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    verify_session(&parts.headers, state).await.map(SessionCookie)
  }
}
