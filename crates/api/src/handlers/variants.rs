//! Handlers for the `/variants` and `/templates` resources.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use kitforge_core::types::DbId;
use kitforge_db::models::design_variant::{
    DesignVariantView, GenerateVariants, UpdateVariantStatus, VariantListQuery,
};
use kitforge_db::models::status::DesignVariantStatus;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;
use crate::variants::VariantManager;

/// Result of a bulk delete.
#[derive(Debug, Serialize)]
pub struct DeletedCount {
    pub deleted: usize,
}

/// POST /api/v1/variants/generate
///
/// Render previews for a template and record them as variants. Returns 201
/// with the created variants.
pub async fn generate_variants(
    State(state): State<AppState>,
    Json(input): Json<GenerateVariants>,
) -> AppResult<impl IntoResponse> {
    let config = input
        .config
        .ok_or_else(|| AppError::BadRequest("Missing required 'config' field".into()))?;

    let created = VariantManager::new(&state)
        .generate(input.template_id, config)
        .await?;
    let data: Vec<DesignVariantView> = created.into_iter().map(Into::into).collect();

    Ok((StatusCode::CREATED, Json(DataResponse { data })))
}

/// GET /api/v1/variants?item_id=
pub async fn list_variants(
    State(state): State<AppState>,
    Query(params): Query<VariantListQuery>,
) -> AppResult<impl IntoResponse> {
    let variants = VariantManager::new(&state).list(params.item_id).await?;
    let data: Vec<DesignVariantView> = variants.into_iter().map(Into::into).collect();
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/variants/{id}
pub async fn get_variant(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let variant = VariantManager::new(&state).get(id).await?;
    Ok(Json(DataResponse {
        data: DesignVariantView::from(variant),
    }))
}

/// PATCH /api/v1/variants/{id}
///
/// Select or deselect a variant. Only `preview` and `selected` are
/// accepted; variants in production cannot be changed.
pub async fn update_variant_status(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateVariantStatus>,
) -> AppResult<impl IntoResponse> {
    let selected = match DesignVariantStatus::from_name(&input.status) {
        Some(DesignVariantStatus::Selected) => true,
        Some(DesignVariantStatus::Preview) => false,
        _ => {
            return Err(AppError::BadRequest(format!(
                "Status must be 'preview' or 'selected', got '{}'",
                input.status
            )))
        }
    };

    let variant = VariantManager::new(&state).select(id, selected).await?;
    Ok(Json(DataResponse {
        data: DesignVariantView::from(variant),
    }))
}

/// DELETE /api/v1/variants/{id}
pub async fn delete_variant(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    VariantManager::new(&state).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/variants?item_id=&all=true
///
/// Bulk delete; `all=true` must be passed explicitly.
pub async fn delete_all_variants(
    State(state): State<AppState>,
    Query(params): Query<VariantListQuery>,
) -> AppResult<impl IntoResponse> {
    if !params.all {
        return Err(AppError::BadRequest(
            "Deleting every variant of an item requires all=true".into(),
        ));
    }

    let deleted = VariantManager::new(&state)
        .delete_all(params.item_id)
        .await?;
    Ok(Json(DataResponse {
        data: DeletedCount { deleted },
    }))
}

/// GET /api/v1/templates/{id}/layers
///
/// Editable layers of a template, for building configuration forms.
pub async fn list_template_layers(
    State(state): State<AppState>,
    Path(template_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let layers = VariantManager::new(&state)
        .editable_layers(template_id)
        .await?;
    Ok(Json(DataResponse { data: layers }))
}
