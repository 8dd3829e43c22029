//! Route definitions for production instructions.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::production;
use crate::state::AppState;

/// Largest accepted export upload.
const MAX_ARTIFACT_BYTES: usize = 256 * 1024 * 1024;

/// Routes mounted at `/bridge`.
///
/// ```text
/// POST   /jobs            -> enqueue_jobs
/// ```
pub fn bridge_router() -> Router<AppState> {
    Router::new().route("/jobs", post(production::enqueue_jobs))
}

/// Routes mounted at `/design-instructions`.
///
/// ```text
/// GET    /                          -> list_instructions
/// POST   /claim                     -> claim_instructions
/// GET    /{id}                      -> get_instruction
/// PATCH  /{id}                      -> update_instruction
/// POST   /{id}/artifacts/{format}   -> upload_artifact
/// ```
pub fn instructions_router() -> Router<AppState> {
    Router::new()
        .route("/", get(production::list_instructions))
        .route("/claim", post(production::claim_instructions))
        .route(
            "/{id}",
            get(production::get_instruction).patch(production::update_instruction),
        )
        .route(
            "/{id}/artifacts/{format}",
            post(production::upload_artifact).layer(DefaultBodyLimit::max(MAX_ARTIFACT_BYTES)),
        )
}
