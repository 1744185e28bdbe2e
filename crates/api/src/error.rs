use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mdedit_core::error::CoreError;
use serde_json::json;

use crate::documents::{DocumentError, GateError, LockedDocument};

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `mdedit_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A filesystem error while touching documents or attachments.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A write refused because another session holds the document's lock.
    #[error("Document '{}' is locked by another session", .0.path)]
    Locked(Box<LockedDocument>),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::NotFound { kind, path } => {
                AppError::Core(CoreError::NotFound { entity: kind, id: path })
            }
            DocumentError::AlreadyExists { kind, path } => {
                AppError::Core(CoreError::Conflict(format!("{kind} '{path}' already exists")))
            }
            DocumentError::Io(e) => AppError::Io(e),
        }
    }
}

impl From<GateError<sqlx::Error>> for AppError {
    fn from(err: GateError<sqlx::Error>) -> Self {
        match err {
            GateError::Locked(locked) => AppError::Locked(locked),
            GateError::MissingHolder => {
                AppError::BadRequest("session_id is required unless force_save is set".into())
            }
            GateError::Document(e) => e.into(),
            GateError::Store(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} '{id}' not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Storage errors ---
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::Io(err) => {
                tracing::error!(error = %err, "Filesystem error");
                internal()
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
            AppError::Locked(locked) => {
                let body = json!({
                    "success": false,
                    "error": format!("File is locked by another session: {}", locked.path),
                    "code": "LOCKED",
                    "lockStatus": locked.lock,
                });
                return (StatusCode::LOCKED, axum::Json(body)).into_response();
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - A pool timeout or SQLite busy error (the lock store stayed locked past
///   its bounded wait) maps to 503.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::PoolTimedOut => store_busy(err),
        // SQLITE_BUSY (5) and its extended codes.
        sqlx::Error::Database(db_err)
            if db_err.code().is_some_and(|c| c.parse::<i32>().is_ok_and(|n| n & 0xff == 5)) =>
        {
            store_busy(err)
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}

fn store_busy(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %err, "Lock store busy");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        "STORE_BUSY",
        "The lock store is busy, retry shortly".to_string(),
    )
}
