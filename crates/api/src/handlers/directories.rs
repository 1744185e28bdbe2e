//! Handlers for directories under the documents root.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use mdedit_core::documents::normalize_dir_path;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::handlers::files::{non_blank, rename_paths, RenameRequest};
use crate::middleware::basic_auth::BasicAuth;
use crate::state::AppState;

/// Body of `POST /api/directory` and query of `DELETE /api/directory`.
#[derive(Debug, Deserialize)]
pub struct DirectoryRequest {
    #[serde(default)]
    pub path: Option<String>,
}

/// Normalized, non-root directory path, or 400.
fn required_dir_path(raw: Option<&str>) -> AppResult<String> {
    let raw = non_blank(raw)
        .ok_or_else(|| AppError::BadRequest("Directory path is required".into()))?;
    let path = normalize_dir_path(raw)?;
    if path.is_empty() {
        return Err(AppError::BadRequest(
            "The documents root cannot be targeted".into(),
        ));
    }
    Ok(path)
}

/// POST /api/directory
pub async fn create_directory(
    _auth: BasicAuth,
    State(state): State<AppState>,
    Json(input): Json<DirectoryRequest>,
) -> AppResult<impl IntoResponse> {
    let path = required_dir_path(input.path.as_deref())?;
    state.documents.store().create_dir(&path).await?;
    tracing::info!(path = %path, "Directory created");
    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/directory?path=..
///
/// Recursive delete. Locks on documents inside are left to expire.
pub async fn delete_directory(
    _auth: BasicAuth,
    State(state): State<AppState>,
    Query(params): Query<DirectoryRequest>,
) -> AppResult<impl IntoResponse> {
    let path = required_dir_path(params.path.as_deref())?;
    state.documents.store().delete_dir(&path).await?;
    tracing::info!(path = %path, "Directory deleted");
    Ok(Json(json!({ "success": true })))
}

/// POST /api/directory/rename
pub async fn rename_directory(
    _auth: BasicAuth,
    State(state): State<AppState>,
    Json(input): Json<RenameRequest>,
) -> AppResult<impl IntoResponse> {
    let (old, new) = rename_paths(&input)?;
    state.documents.store().rename_dir(&old, &new).await?;
    tracing::info!(from = %old, to = %new, "Directory renamed");
    Ok(Json(json!({ "success": true })))
}
