#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use kitforge_api::catalog::PgCatalog;
use kitforge_api::config::{ArtifactConfig, ServerConfig};
use kitforge_api::router::build_app_router;
use kitforge_api::state::AppState;
use kitforge_api::storage::LocalArtifactStore;
use kitforge_api::variants::TemplateCache;

pub const JERSEY_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 300 300">
  <g id="body"><path d="M0 0h100v100z" fill="#ffffff"/></g>
  <text id="player_name" x="10" y="280">PLAYER</text>
  <g id="teamNumber"><text>00</text></g>
</svg>"##;

/// Build a test `ServerConfig` with safe defaults, storing artifacts under
/// `artifact_dir`.
pub fn test_config(artifact_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        artifacts: ArtifactConfig {
            dir: artifact_dir.to_path_buf(),
            base_url: "/artifacts".to_string(),
        },
    }
}

/// Build the full application router through the same builder `main.rs`
/// uses.
pub fn build_test_app(pool: PgPool, artifact_dir: &Path) -> Router {
    let config = test_config(artifact_dir);
    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        catalog: Arc::new(PgCatalog::new(pool)),
        store: Arc::new(LocalArtifactStore::from_config(&config.artifacts)),
        template_cache: Arc::new(TemplateCache::new()),
    };
    build_app_router(state, &config)
}

/// Insert a template for `item_id` and return its id.
pub async fn seed_template(pool: &PgPool, item_id: i64, vector_source: Option<&str>) -> i64 {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO design_templates (item_id, name, vector_source, master_document_url) \
         VALUES ($1, 'Home', $2, 'https://files.example/home.ai') RETURNING id",
    )
    .bind(item_id)
    .bind(vector_source)
    .fetch_one(pool)
    .await
    .unwrap();
    id
}

pub async fn seed_color(pool: &PgPool, id: &str, hex: &str) {
    sqlx::query("INSERT INTO catalog_colors (id, name, hex) VALUES ($1, $1, $2)")
        .bind(id)
        .bind(hex)
        .execute(pool)
        .await
        .unwrap();
}

async fn send(app: Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None).await
}

pub async fn delete(app: Router, uri: &str) -> Response {
    send(app, Method::DELETE, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn patch_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::PATCH, uri, Some(body)).await
}

/// POST an empty body.
pub async fn post(app: Router, uri: &str) -> Response {
    send(app, Method::POST, uri, None).await
}

/// POST a single-file multipart form with field name `file`.
pub async fn post_file(app: Router, uri: &str, filename: &str, bytes: &[u8]) -> Response {
    let boundary = "kitforge-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
