//! Templates and catalog assets referenced by configurations.

use kitforge_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `design_templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DesignTemplate {
    pub id: DbId,
    pub item_id: DbId,
    pub name: String,
    /// SVG markup the customization engine works on.
    pub vector_source: Option<String>,
    /// Native master document the design tool opens for production.
    pub master_document_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `catalog_colors` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CatalogColor {
    pub id: String,
    pub name: String,
    pub hex: String,
}

/// Kinds stored in `catalog_assets.kind`.
pub const ASSET_KIND_LOGO: &str = "logo";
pub const ASSET_KIND_PATTERN: &str = "pattern";
pub const ASSET_KIND_EMBELLISHMENT: &str = "embellishment";

/// A row from the `catalog_assets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CatalogAsset {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub url: String,
}
