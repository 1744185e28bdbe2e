#![allow(dead_code)]

use std::path::PathBuf;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use mdedit_api::config::{ServerConfig, DEFAULT_MAX_UPLOAD_BYTES};
use mdedit_api::router::build_app_router;
use mdedit_api::state::AppState;

/// Build a test `ServerConfig` rooted at `work_dir`.
///
/// Uses `http://localhost:5000` as CORS origin and a users file that does
/// not exist, so authentication is disabled unless a test writes one.
pub fn test_config(work_dir: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5000".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        database_url: "sqlite::memory:".to_string(),
        static_dir: work_dir.join("static"),
        users_file: work_dir.join("users.json"),
        max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        lock_sweep_interval_secs: 900,
        work_dir,
    }
}

/// Build the full application router over `pool` and a fresh work directory.
///
/// The returned [`TempDir`] owns the documents and attachments; keep it
/// alive for the duration of the test.
pub fn build_test_app(pool: SqlitePool) -> (TempDir, Router) {
    let work = TempDir::new().unwrap();
    let config = test_config(work.path().to_path_buf());

    std::fs::create_dir_all(config.documents_dir()).unwrap();
    std::fs::create_dir_all(config.attachments_dir()).unwrap();

    let state = AppState::new(pool, config.clone());
    let app = build_app_router(state, &config);
    (work, app)
}

/// Write a users file into the work directory, enabling Basic auth.
pub fn write_users(work: &TempDir, users: serde_json::Value) {
    std::fs::write(
        work.path().join("users.json"),
        serde_json::to_vec(&users).unwrap(),
    )
    .unwrap();
}

/// `Authorization` header value for the given credentials.
pub fn basic_header(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// Read the full response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Read the full response body as bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Send a single request through the router.
pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

/// GET `uri`.
pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// GET `uri` with an `Authorization` header.
pub async fn get_auth(app: &Router, uri: &str, authorization: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("Authorization", authorization)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// POST a JSON body to `uri`.
pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// DELETE `uri`.
pub async fn delete(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// POST a multipart upload with a single `file` field.
pub async fn upload(app: &Router, filename: &str, data: &[u8]) -> Response<Body> {
    let boundary = "mdedit-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

/// Save a document as `session_id` and assert it succeeded.
pub async fn save_document(app: &Router, path: &str, content: &str, session_id: &str) {
    let response = post_json(
        app,
        "/api/file",
        serde_json::json!({
            "path": path,
            "content": content,
            "session_id": session_id,
        }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}
