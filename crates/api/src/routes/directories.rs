//! Route definitions for the `/directory` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::directories;
use crate::state::AppState;

/// Routes mounted at `/directory`.
///
/// ```text
/// POST   /           -> create_directory
/// DELETE /           -> delete_directory  (?path=..)
/// POST   /rename     -> rename_directory
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(directories::create_directory).delete(directories::delete_directory),
        )
        .route("/rename", post(directories::rename_directory))
}
