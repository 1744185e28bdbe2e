//! Handlers for markdown documents: read, save, delete, rename and the tree
//! listing.
//!
//! Reads and saves go through the [`DocumentGate`](crate::documents::DocumentGate)
//! so they participate in file locking.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use mdedit_core::documents::{
    default_format_options, normalize_dir_path, normalize_document_path, DOCUMENT_EXTENSION,
};
use mdedit_core::types::local_now;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::basic_auth::BasicAuth;
use crate::state::AppState;

/// Query of `GET /api/file` and `DELETE /api/file`.
#[derive(Debug, Deserialize)]
pub struct FileQuery {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Body of `POST /api/file`.
#[derive(Debug, Deserialize)]
pub struct SaveFileRequest {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, rename = "formatOptions")]
    pub format_options: Option<Value>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub force_save: bool,
}

/// Body of `POST /api/file/rename` and `POST /api/directory/rename`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    #[serde(default)]
    pub old_path: Option<String>,
    #[serde(default)]
    pub new_path: Option<String>,
}

/// Treat an absent or blank string as missing.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// The document path of a request, normalized, or 400.
pub(crate) fn required_document_path(raw: Option<&str>) -> AppResult<String> {
    let raw = non_blank(raw).ok_or_else(|| AppError::BadRequest("path is required".into()))?;
    Ok(normalize_document_path(raw)?)
}

/// Both paths of a rename request, normalized and non-empty, or 400.
pub(crate) fn rename_paths(input: &RenameRequest) -> AppResult<(String, String)> {
    let (Some(old), Some(new)) = (
        non_blank(input.old_path.as_deref()),
        non_blank(input.new_path.as_deref()),
    ) else {
        return Err(AppError::BadRequest(
            "Both old and new paths must be provided".into(),
        ));
    };

    let old = normalize_dir_path(old)?;
    let new = normalize_dir_path(new)?;
    if old.is_empty() || new.is_empty() {
        return Err(AppError::BadRequest(
            "Both old and new paths must be provided".into(),
        ));
    }
    Ok((old, new))
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// GET /api/files
///
/// Flat listing of every directory and `.md` file, sorted by path.
pub async fn list_files(
    _auth: BasicAuth,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let tree = state.documents.store().list_tree().await?;
    Ok(Json(tree))
}

/// GET /api/file?path=..&session_id=..
///
/// Returns the document with its lock status. With a `session_id` the read
/// also acquires or refreshes that session's lock.
pub async fn get_file(
    _auth: BasicAuth,
    State(state): State<AppState>,
    Query(params): Query<FileQuery>,
) -> AppResult<impl IntoResponse> {
    let path = required_document_path(params.path.as_deref())?;
    let holder = non_blank(params.session_id.as_deref());

    let opened = state.documents.open(&path, holder, local_now()).await?;
    Ok(Json(opened))
}

/// POST /api/file
///
/// Save a document. Returns 423 if another session holds a live lock and
/// the save is not forced.
pub async fn save_file(
    _auth: BasicAuth,
    State(state): State<AppState>,
    Json(input): Json<SaveFileRequest>,
) -> AppResult<impl IntoResponse> {
    let path = required_document_path(input.path.as_deref())?;
    let holder = non_blank(input.session_id.as_deref());
    let format_options = input
        .format_options
        .unwrap_or_else(default_format_options);

    state
        .documents
        .save(
            &path,
            &input.content,
            &format_options,
            holder,
            input.force_save,
            local_now(),
        )
        .await?;

    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/file?path=..
///
/// Delete a document, its sidecar and any lock on it.
pub async fn delete_file(
    _auth: BasicAuth,
    State(state): State<AppState>,
    Query(params): Query<FileQuery>,
) -> AppResult<impl IntoResponse> {
    let path = required_document_path(params.path.as_deref())?;
    state.documents.remove(&path).await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/file/rename
///
/// Move a document. `.md` is appended to the new path when the old one had
/// it. Locks stay keyed by the old path.
pub async fn rename_file(
    _auth: BasicAuth,
    State(state): State<AppState>,
    Json(input): Json<RenameRequest>,
) -> AppResult<impl IntoResponse> {
    let (old, mut new) = rename_paths(&input)?;
    if old.ends_with(DOCUMENT_EXTENSION) && !new.ends_with(DOCUMENT_EXTENSION) {
        new.push_str(DOCUMENT_EXTENSION);
    }

    state.documents.store().rename(&old, &new).await?;
    tracing::info!(from = %old, to = %new, "Document renamed");
    Ok(Json(json!({ "success": true })))
}
