//! Handlers for production instructions.
//!
//! Operators enqueue through `/bridge/jobs`; bridges claim and report
//! through `/design-instructions`.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use kitforge_core::production::ExportFormat;
use kitforge_core::types::DbId;
use kitforge_db::models::design_instruction::{
    ClaimQuery, DesignInstructionView, EnqueueRequest, InstructionListQuery,
    UpdateInstructionStatus,
};

use crate::error::{AppError, AppResult};
use crate::production::ProductionQueue;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/bridge/jobs
///
/// Queue selected variants for production. Variants that cannot be queued
/// are counted in `skipped`.
pub async fn enqueue_jobs(
    State(state): State<AppState>,
    Json(input): Json<EnqueueRequest>,
) -> AppResult<impl IntoResponse> {
    if input.variant_ids.is_empty() {
        return Err(AppError::BadRequest("variant_ids must not be empty".into()));
    }

    let result = ProductionQueue::new(&state)
        .enqueue(&input.variant_ids, input.priority)
        .await?;
    Ok(Json(DataResponse { data: result }))
}

/// GET /api/v1/design-instructions?status=&limit=
pub async fn list_instructions(
    State(state): State<AppState>,
    Query(params): Query<InstructionListQuery>,
) -> AppResult<impl IntoResponse> {
    let instructions = ProductionQueue::new(&state)
        .list(params.status.as_deref(), params.limit)
        .await?;
    let data: Vec<DesignInstructionView> = instructions.into_iter().map(Into::into).collect();
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/design-instructions/claim?limit=
///
/// Atomically move pending instructions to `processing` and return them.
/// Two callers never receive the same instruction.
pub async fn claim_instructions(
    State(state): State<AppState>,
    Query(params): Query<ClaimQuery>,
) -> AppResult<impl IntoResponse> {
    let claimed = ProductionQueue::new(&state)
        .claim_pending(params.limit)
        .await?;
    let data: Vec<DesignInstructionView> = claimed.into_iter().map(Into::into).collect();
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/design-instructions/{id}
pub async fn get_instruction(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let instruction = ProductionQueue::new(&state).get(id).await?;
    Ok(Json(DataResponse {
        data: DesignInstructionView::from(instruction),
    }))
}

/// PATCH /api/v1/design-instructions/{id}
///
/// Status report from a bridge: `processing`, `completed` (with
/// `artifacts`) or `failed` (with `error_message`).
pub async fn update_instruction(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateInstructionStatus>,
) -> AppResult<impl IntoResponse> {
    let instruction = ProductionQueue::new(&state).apply_update(id, input).await?;
    Ok(Json(DataResponse {
        data: DesignInstructionView::from(instruction),
    }))
}

/// POST /api/v1/design-instructions/{id}/artifacts/{format}
///
/// Accepts a multipart form with a required `file` field holding one
/// exported document. `format` is a format name or file extension.
pub async fn upload_artifact(
    State(state): State<AppState>,
    Path((id, format)): Path<(DbId, String)>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let format: ExportFormat = format.parse()?;
    let mut file_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            file_data = Some(data.to_vec());
        }
    }

    let data =
        file_data.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;

    let stored = ProductionQueue::new(&state)
        .store_artifact(id, format, data)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: stored })))
}
