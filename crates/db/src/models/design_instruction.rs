//! Production instruction entity and DTOs.

use kitforge_core::production::ArtifactMap;
use kitforge_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::{InstructionStatus, StatusId};

/// A row from the `design_instructions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DesignInstruction {
    pub id: DbId,
    /// `None` once the variant has been deleted.
    pub variant_id: Option<DbId>,
    pub status_id: StatusId,
    pub priority: i32,
    /// `InstructionSnapshot` taken at enqueue time.
    pub instructions: serde_json::Value,
    pub master_document_url: String,
    pub artifacts: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub claimed_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DesignInstruction {
    pub fn status(&self) -> Option<InstructionStatus> {
        InstructionStatus::from_id(self.status_id)
    }
}

/// API view of an instruction with its status name alongside the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignInstructionView {
    pub id: DbId,
    pub variant_id: Option<DbId>,
    pub status: String,
    pub priority: i32,
    pub instructions: serde_json::Value,
    pub master_document_url: String,
    pub artifacts: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub claimed_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<DesignInstruction> for DesignInstructionView {
    fn from(row: DesignInstruction) -> Self {
        let status = row
            .status()
            .map_or("unknown", InstructionStatus::name)
            .to_string();
        Self {
            id: row.id,
            variant_id: row.variant_id,
            status,
            priority: row.priority,
            instructions: row.instructions,
            master_document_url: row.master_document_url,
            artifacts: row.artifacts,
            error_message: row.error_message,
            claimed_at: row.claimed_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Body of `POST /bridge/jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct EnqueueRequest {
    pub variant_ids: Vec<DbId>,
    #[serde(default)]
    pub priority: i32,
}

/// Result of an enqueue request.
#[derive(Debug, Clone, Serialize)]
pub struct EnqueueResult {
    pub created: usize,
    pub skipped: usize,
    pub instructions: Vec<DesignInstructionView>,
}

/// Body of `PATCH /design-instructions/{id}`.
///
/// `status` is one of `processing` (production started), `completed` or
/// `failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateInstructionStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<ArtifactMap>,
}

/// Query parameters for `GET /design-instructions`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstructionListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

/// Query parameters for `POST /design-instructions/claim`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimQuery {
    pub limit: Option<i64>,
}
