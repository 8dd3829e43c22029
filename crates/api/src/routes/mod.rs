pub mod health;
pub mod production;
pub mod templates;
pub mod variants;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /variants/generate                               render previews (POST)
/// /variants                                        list, bulk delete (?item_id=)
/// /variants/{id}                                   get, select/deselect, delete
///
/// /templates/{id}/layers                           editable layers
///
/// /bridge/jobs                                     enqueue selected variants (POST)
///
/// /design-instructions                             list (?status=)
/// /design-instructions/claim                       claim pending (POST)
/// /design-instructions/{id}                        get, status report (PATCH)
/// /design-instructions/{id}/artifacts/{format}     upload export (POST, multipart)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/variants", variants::router())
        .nest("/templates", templates::router())
        .nest("/bridge", production::bridge_router())
        .nest("/design-instructions", production::instructions_router())
}
