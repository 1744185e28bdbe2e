//! Attachment upload handler. Stored files are served by `ServeDir` under
//! `/attachment`.

use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::basic_auth::BasicAuth;
use crate::state::AppState;

/// Response of `POST /api/upload`.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    pub url: String,
    pub duplicate: bool,
}

/// POST /api/upload
///
/// Multipart upload with the file in the `file` field. Identical content is
/// stored once; a repeat upload returns the existing file with
/// `duplicate: true`.
pub async fn upload_attachment(
    _auth: BasicAuth,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        if original_name.trim().is_empty() {
            return Err(AppError::BadRequest("No selected file".into()));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let stored = state.attachments.store(&original_name, &data).await?;
        return Ok(Json(UploadResponse {
            success: true,
            url: format!("/attachment/{}", stored.filename),
            filename: stored.filename,
            duplicate: stored.duplicate,
        }));
    }

    Err(AppError::BadRequest("No file part".into()))
}
