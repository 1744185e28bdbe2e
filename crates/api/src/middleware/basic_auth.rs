//! HTTP Basic authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use mdedit_core::error::CoreError;

use crate::auth::users::{authenticate, load_users};
use crate::error::AppError;
use crate::state::AppState;

/// Caller authenticated via `Authorization: Basic ...`.
///
/// Add it as a handler parameter to require credentials. When the users
/// file is missing or empty every request passes with `username = None`.
/// The file is re-read on every request so edits apply without a restart.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: Option<String>,
}

impl FromRequestParts<AppState> for BasicAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let users = load_users(&state.config.users_file).await.map_err(|e| {
            AppError::InternalError(format!("Failed to load users file: {e}"))
        })?;
        if users.is_empty() {
            return Ok(BasicAuth { username: None });
        }

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Authentication required"))?;

        let (username, password) = decode_credentials(header)
            .ok_or_else(|| unauthorized("Invalid authentication format"))?;

        if !authenticate(&users, &username, &password) {
            tracing::warn!(username = %username, "Rejected Basic auth credentials");
            return Err(unauthorized("Invalid username or password"));
        }

        Ok(BasicAuth {
            username: Some(username),
        })
    }
}

/// Split a `Basic <base64(user:pass)>` header value into its parts.
fn decode_credentials(header: &str) -> Option<(String, String)> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn unauthorized(message: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(message.into()))
}
