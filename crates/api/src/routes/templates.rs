//! Route definitions for the `/templates` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::variants;
use crate::state::AppState;

/// Routes mounted at `/templates`.
///
/// ```text
/// GET    /{id}/layers     -> list_template_layers
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/layers", get(variants::list_template_layers))
}
