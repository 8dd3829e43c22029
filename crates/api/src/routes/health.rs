//! Readiness of the generation service and the dependencies it writes to.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use kitforge_db::models::status::InstructionStatus;
use kitforge_db::repositories::DesignInstructionRepo;
use serde::Serialize;

use crate::state::AppState;

/// Outcome of a single dependency check.
#[derive(Debug, Serialize)]
pub struct Check {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<E: std::fmt::Display> From<Result<(), E>> for Check {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self { ok: true, error: None },
            Err(e) => Self {
                ok: false,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: Check,
    pub artifact_store: Check,
}

/// Health check response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ready` when every check passes, otherwise `unavailable`.
    pub status: &'static str,
    pub version: &'static str,
    pub checks: HealthChecks,
    /// Instructions waiting for the bridge; absent when the database is down.
    pub pending_instructions: Option<i64>,
    pub cached_templates: usize,
}

/// GET /health -- 200 when variants can be generated and queued, else 503.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = Check::from(kitforge_db::health_check(&state.pool).await);
    let artifact_store = Check::from(state.store.check().await);

    let pending_instructions = if database.ok {
        DesignInstructionRepo::count_in_status(&state.pool, InstructionStatus::Pending)
            .await
            .ok()
    } else {
        None
    };

    let ready = database.ok && artifact_store.ok;
    if !ready {
        tracing::warn!(
            database = ?database.error,
            artifact_store = ?artifact_store.error,
            "Health check failed",
        );
    }

    let response = HealthResponse {
        status: if ready { "ready" } else { "unavailable" },
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks {
            database,
            artifact_store,
        },
        pending_instructions,
        cached_templates: state.template_cache.len(),
    };
    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(response))
}

/// Mount health check routes (root level, not under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_check_carries_its_error() {
        let check = Check::from(Err::<(), _>("disk full"));
        assert!(!check.ok);
        assert_eq!(check.error.as_deref(), Some("disk full"));

        let json = serde_json::to_value(Check::from(Ok::<(), String>(()))).unwrap();
        assert_eq!(json, serde_json::json!({ "ok": true }));
    }
}
