//! Template and asset lookups used when generating variants.
//!
//! Handlers go through [`DesignCatalog`] rather than [`CatalogRepo`]
//! directly, so tests can substitute an in-memory catalog.

use std::collections::BTreeMap;

use async_trait::async_trait;
use kitforge_core::customize::{AssetRequest, ResolvedAssets};
use kitforge_core::types::DbId;
use kitforge_db::models::catalog::{
    DesignTemplate, ASSET_KIND_EMBELLISHMENT, ASSET_KIND_LOGO, ASSET_KIND_PATTERN,
};
use kitforge_db::repositories::CatalogRepo;
use kitforge_db::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog query failed: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait DesignCatalog: Send + Sync + 'static {
    async fn find_template(&self, id: DbId) -> Result<Option<DesignTemplate>, CatalogError>;

    /// Resolve every id in `request`. Ids the catalog does not know are
    /// left out of the result.
    async fn resolve_assets(&self, request: &AssetRequest)
        -> Result<ResolvedAssets, CatalogError>;
}

/// [`DesignCatalog`] backed by the catalog tables.
pub struct PgCatalog {
    pool: DbPool,
}

impl PgCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn asset_urls(
        &self,
        kind: &str,
        ids: &[String],
    ) -> Result<BTreeMap<String, String>, CatalogError> {
        let rows = CatalogRepo::assets_by_ids(&self.pool, kind, ids).await?;
        Ok(rows.into_iter().map(|a| (a.id, a.url)).collect())
    }
}

#[async_trait]
impl DesignCatalog for PgCatalog {
    async fn find_template(&self, id: DbId) -> Result<Option<DesignTemplate>, CatalogError> {
        Ok(CatalogRepo::find_template(&self.pool, id).await?)
    }

    async fn resolve_assets(
        &self,
        request: &AssetRequest,
    ) -> Result<ResolvedAssets, CatalogError> {
        if request.is_empty() {
            return Ok(ResolvedAssets::default());
        }

        let color_ids: Vec<String> = request.color_ids.iter().cloned().collect();
        let colors = CatalogRepo::colors_by_ids(&self.pool, &color_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c.hex.to_ascii_lowercase()))
            .collect();

        let logo_ids: Vec<String> = request.logo_ids.iter().cloned().collect();
        let pattern_ids: Vec<String> = request.pattern_ids.iter().cloned().collect();
        let embellishment_ids: Vec<String> = request.embellishment_ids.iter().cloned().collect();

        let resolved = ResolvedAssets {
            colors,
            logos: self.asset_urls(ASSET_KIND_LOGO, &logo_ids).await?,
            patterns: self.asset_urls(ASSET_KIND_PATTERN, &pattern_ids).await?,
            embellishments: self
                .asset_urls(ASSET_KIND_EMBELLISHMENT, &embellishment_ids)
                .await?,
        };

        tracing::debug!(
            colors = resolved.colors.len(),
            logos = resolved.logos.len(),
            patterns = resolved.patterns.len(),
            embellishments = resolved.embellishments.len(),
            "Resolved catalog assets",
        );
        Ok(resolved)
    }
}
