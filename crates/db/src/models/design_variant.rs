//! Design variant entity and DTOs.

use kitforge_core::customize::VariantConfiguration;
use kitforge_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::{DesignVariantStatus, StatusId};

/// A row from the `design_variants` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DesignVariant {
    pub id: DbId,
    pub item_id: DbId,
    pub template_id: DbId,
    pub name: String,
    /// The `VariantConfiguration` this variant was rendered from.
    pub configuration: serde_json::Value,
    pub preview_artifact_ref: String,
    pub final_artifact_ref: Option<String>,
    /// Export format -> artifact ref, set when production completes.
    pub final_artifacts: Option<serde_json::Value>,
    pub status_id: StatusId,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DesignVariant {
    pub fn status(&self) -> Option<DesignVariantStatus> {
        DesignVariantStatus::from_id(self.status_id)
    }
}

/// Insert DTO; new variants always start in `preview`.
#[derive(Debug, Clone)]
pub struct CreateDesignVariant {
    pub item_id: DbId,
    pub template_id: DbId,
    pub name: String,
    pub configuration: serde_json::Value,
    pub preview_artifact_ref: String,
}

/// Body of `POST /variants/generate`.
///
/// `config` is optional at the serde level so a missing configuration is
/// reported as a 400 rather than a body rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateVariants {
    pub template_id: DbId,
    #[serde(default)]
    pub config: Option<VariantConfiguration>,
}

/// API view of a variant with its status name alongside the id.
#[derive(Debug, Clone, Serialize)]
pub struct DesignVariantView {
    #[serde(flatten)]
    pub variant: DesignVariant,
    pub status: &'static str,
}

impl From<DesignVariant> for DesignVariantView {
    fn from(variant: DesignVariant) -> Self {
        let status = variant.status().map_or("unknown", DesignVariantStatus::name);
        Self { variant, status }
    }
}

/// Body of `PATCH /variants/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateVariantStatus {
    pub status: String,
}

/// Query parameters for `GET /variants` and `DELETE /variants`.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantListQuery {
    pub item_id: DbId,
    /// Must be `true` for the bulk delete.
    #[serde(default)]
    pub all: bool,
}
