pub mod directories;
pub mod files;
pub mod health;

use axum::extract::OriginalUri;
use axum::routing::post;
use axum::Router;
use mdedit_core::error::CoreError;

use crate::error::AppError;
use crate::handlers;
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /files                  tree listing (GET)
/// /files/locks            active locks (GET)
///
/// /file                   read (GET), save (POST), delete (DELETE)
/// /file/lock              status (GET), acquire / release (POST)
/// /file/rename            rename or move a document (POST)
///
/// /directory              create (POST), delete (DELETE)
/// /directory/rename       rename or move a directory (POST)
///
/// /upload                 attachment upload, multipart (POST)
/// ```
///
/// Every handler requires Basic credentials when a users file is configured.
/// Unmatched paths under `/api` get a JSON 404 instead of the frontend.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Document tree and lock listing.
        .nest("/files", files::files_router())
        // Single document, its lock and rename.
        .nest("/file", files::file_router())
        // Directories.
        .nest("/directory", directories::router())
        // Attachments (served back by the static `/attachment` service).
        .route("/upload", post(handlers::attachments::upload_attachment))
        .fallback(api_not_found)
}

async fn api_not_found(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Route",
        id: uri.path().to_string(),
    })
}
