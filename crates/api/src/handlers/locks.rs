//! Handlers for explicit file lock operations.
//!
//! Acquire doubles as the refresh/heartbeat: a client holding a lock simply
//! acquires it again before the 10 minute TTL runs out.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use mdedit_core::file_lock::AcquireReason;
use mdedit_core::types::local_now;
use mdedit_db::models::file_lock::{LockActionRequest, LockStatusQuery};
use serde::Serialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::handlers::files::{non_blank, required_document_path};
use crate::middleware::basic_auth::BasicAuth;
use crate::state::AppState;

/// Response of `GET /api/file/lock`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockStatusResponse {
    pub is_locked: bool,
    pub lock_owner: Option<String>,
    pub lock_time: Option<String>,
    pub is_expired: bool,
}

/// POST /api/file/lock
///
/// `action` is `acquire` or `release`. Acquire answers 200 when granted and
/// 423 when another session holds a live lock; release answers 423 when the
/// caller is not the owner. `force` is accepted and has no effect.
pub async fn lock_action(
    _auth: BasicAuth,
    State(state): State<AppState>,
    Json(input): Json<LockActionRequest>,
) -> AppResult<impl IntoResponse> {
    let path = required_document_path(input.path.as_deref())?;
    let session_id = non_blank(input.session_id.as_deref())
        .ok_or_else(|| AppError::BadRequest("session_id is required".into()))?;

    match non_blank(input.action.as_deref()) {
        Some("acquire") => {
            let outcome = state.locks.acquire(&path, session_id, local_now()).await?;

            match outcome.reason {
                AcquireReason::Acquired
                | AcquireReason::ExpiredTakenOver
                | AcquireReason::InvalidTakenOver => {
                    tracing::info!(
                        path = %path,
                        holder = %session_id,
                        reason = outcome.reason.message(),
                        "Lock granted"
                    );
                }
                AcquireReason::Refreshed => {
                    tracing::debug!(path = %path, holder = %session_id, "Lock refreshed");
                }
                AcquireReason::LockedByOther => {
                    tracing::debug!(
                        path = %path,
                        holder = %session_id,
                        owner = ?outcome.holder,
                        "Lock denied"
                    );
                }
            }

            let status = if outcome.granted {
                StatusCode::OK
            } else {
                StatusCode::LOCKED
            };
            let body = json!({
                "success": outcome.granted,
                "lockOwner": outcome.holder,
                "message": outcome.reason.message(),
            });
            Ok((status, Json(body)))
        }
        Some("release") => {
            let outcome = state.locks.release(&path, session_id).await?;
            if outcome.success {
                tracing::info!(
                    path = %path,
                    holder = %session_id,
                    reason = outcome.reason.message(),
                    "Lock release"
                );
            } else {
                tracing::warn!(
                    path = %path,
                    holder = %session_id,
                    "Lock release by non-owner refused"
                );
            }

            let status = if outcome.success {
                StatusCode::OK
            } else {
                StatusCode::LOCKED
            };
            let body = json!({
                "success": outcome.success,
                "message": outcome.reason.message(),
            });
            Ok((status, Json(body)))
        }
        _ => Err(AppError::BadRequest(
            "action must be 'acquire' or 'release'".into(),
        )),
    }
}

/// GET /api/file/lock?path=..
///
/// Read-only lock status of one document.
pub async fn lock_status(
    _auth: BasicAuth,
    State(state): State<AppState>,
    Query(params): Query<LockStatusQuery>,
) -> AppResult<impl IntoResponse> {
    let path = required_document_path(params.path.as_deref())?;
    let status = state.locks.status(&path, local_now()).await?;

    Ok(Json(LockStatusResponse {
        is_locked: status.is_locked,
        lock_owner: status.holder,
        lock_time: status.since,
        is_expired: status.is_expired,
    }))
}

/// GET /api/files/locks
///
/// Every lock younger than the TTL.
pub async fn list_locks(
    _auth: BasicAuth,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let locks = state.locks.list_active(local_now()).await?;
    Ok(Json(json!({ "locks": locks })))
}
