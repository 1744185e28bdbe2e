//! Route definitions for documents and their locks.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{files, locks};
use crate::state::AppState;

/// Routes mounted at `/file`.
///
/// ```text
/// GET    /           -> get_file       (?path=..&session_id=..)
/// POST   /           -> save_file
/// DELETE /           -> delete_file    (?path=..)
/// GET    /lock       -> lock_status    (?path=..)
/// POST   /lock       -> lock_action    (acquire | release)
/// POST   /rename     -> rename_file
/// ```
pub fn file_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(files::get_file)
                .post(files::save_file)
                .delete(files::delete_file),
        )
        .route("/lock", get(locks::lock_status).post(locks::lock_action))
        .route("/rename", post(files::rename_file))
}

/// Routes mounted at `/files`.
///
/// ```text
/// GET    /           -> list_files
/// GET    /locks      -> list_locks
/// ```
pub fn files_router() -> Router<AppState> {
    Router::new()
        .route("/", get(files::list_files))
        .route("/locks", get(locks::list_locks))
}
