//! Route definitions for the `/variants` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::variants;
use crate::state::AppState;

/// Routes mounted at `/variants`.
///
/// ```text
/// POST   /generate        -> generate_variants
/// GET    /?item_id=       -> list_variants
/// DELETE /?item_id=&all=  -> delete_all_variants
/// GET    /{id}            -> get_variant
/// PATCH  /{id}            -> update_variant_status
/// DELETE /{id}            -> delete_variant
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(variants::generate_variants))
        .route(
            "/",
            get(variants::list_variants).delete(variants::delete_all_variants),
        )
        .route(
            "/{id}",
            get(variants::get_variant)
                .patch(variants::update_variant_status)
                .delete(variants::delete_variant),
        )
}
