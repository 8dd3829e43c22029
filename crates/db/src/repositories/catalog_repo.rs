//! Repository for `design_templates`, `catalog_colors` and `catalog_assets`.

use kitforge_core::types::DbId;
use sqlx::PgPool;

use crate::models::catalog::{CatalogAsset, CatalogColor, DesignTemplate};

const TEMPLATE_COLUMNS: &str =
    "id, item_id, name, vector_source, master_document_url, created_at, updated_at";

/// Read-only access to templates and catalog assets.
pub struct CatalogRepo;

impl CatalogRepo {
    pub async fn find_template(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<DesignTemplate>, sqlx::Error> {
        let query = format!("SELECT {TEMPLATE_COLUMNS} FROM design_templates WHERE id = $1");
        sqlx::query_as::<_, DesignTemplate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Colors whose id is in `ids`. Unknown ids are simply absent.
    pub async fn colors_by_ids(
        pool: &PgPool,
        ids: &[String],
    ) -> Result<Vec<CatalogColor>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, CatalogColor>(
            "SELECT id, name, hex FROM catalog_colors WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Assets of one `kind` whose id is in `ids`.
    pub async fn assets_by_ids(
        pool: &PgPool,
        kind: &str,
        ids: &[String],
    ) -> Result<Vec<CatalogAsset>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, CatalogAsset>(
            "SELECT id, kind, name, url FROM catalog_assets WHERE kind = $1 AND id = ANY($2)",
        )
        .bind(kind)
        .bind(ids)
        .fetch_all(pool)
        .await
    }
}
