//! Variant generation and lifecycle.
//!
//! Generation holds the item's advisory lock from the count to the final
//! insert, so two concurrent requests can never push an item past
//! [`MAX_VARIANTS_PER_ITEM`](kitforge_core::variant::MAX_VARIANTS_PER_ITEM).

use std::sync::Arc;

use kitforge_core::customize::{
    AssetRequest, CustomizationSession, ResolvedAssets, VariantConfiguration,
};
use kitforge_core::error::CoreError;
use kitforge_core::layers::EditableLayer;
use kitforge_core::types::DbId;
use kitforge_core::variant::{
    cap_expansion, ceiling_reached, expand_configuration, remaining_capacity, variant_name,
};
use kitforge_db::models::catalog::DesignTemplate;
use kitforge_db::models::design_variant::{CreateDesignVariant, DesignVariant};
use kitforge_db::models::status::DesignVariantStatus;
use kitforge_db::repositories::DesignVariantRepo;
use kitforge_db::DbPool;
use sqlx::{Postgres, Transaction};

use crate::catalog::DesignCatalog;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage::ArtifactStore;
use crate::variants::TemplateCache;

const PREVIEW_CONTENT_TYPE: &str = "image/svg+xml";

/// Statuses an operator may toggle between.
const SELECTABLE: [DesignVariantStatus; 2] =
    [DesignVariantStatus::Preview, DesignVariantStatus::Selected];

pub struct VariantManager {
    pool: DbPool,
    catalog: Arc<dyn DesignCatalog>,
    store: Arc<dyn ArtifactStore>,
    template_cache: Arc<TemplateCache>,
}

impl VariantManager {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            catalog: Arc::clone(&state.catalog),
            store: Arc::clone(&state.store),
            template_cache: Arc::clone(&state.template_cache),
        }
    }

    /// Render and record preview variants of a template.
    ///
    /// Fails with 404 for an unknown template, 400 when the template has
    /// no usable vector source or the configuration is invalid, and 409
    /// when the item has no room for another variant.
    pub async fn generate(
        &self,
        template_id: DbId,
        config: VariantConfiguration,
    ) -> AppResult<Vec<DesignVariant>> {
        config.check()?;

        let template = self.template(template_id).await?;
        let source = vector_source(&template)?;
        let parsed = self.template_cache.get_or_parse(template.id, source)?;

        let request = AssetRequest::for_configuration(&config);
        let assets = self.catalog.resolve_assets(&request).await?;

        let mut tx = self.pool.begin().await?;
        DesignVariantRepo::lock_item(&mut tx, template.item_id).await?;

        let existing = DesignVariantRepo::count_for_item(&mut tx, template.item_id).await?;
        let room = remaining_capacity(existing);
        if room == 0 {
            return Err(ceiling_reached(template.item_id).into());
        }
        let expansions = cap_expansion(expand_configuration(&config), room);

        let mut stored = Vec::new();
        let inserted = self
            .insert_previews(
                &mut tx,
                &template,
                &parsed.session,
                &assets,
                expansions,
                existing,
                &mut stored,
            )
            .await;
        let created = match inserted {
            Ok(created) => tx.commit().await.map(|()| created).map_err(AppError::from),
            Err(e) => Err(e),
        };

        match created {
            Ok(created) => {
                tracing::info!(
                    item_id = template.item_id,
                    template_id,
                    count = created.len(),
                    "Generated design variants",
                );
                Ok(created)
            }
            Err(e) => {
                self.discard_artifacts(&stored).await;
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_previews(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        template: &DesignTemplate,
        session: &CustomizationSession,
        assets: &ResolvedAssets,
        expansions: Vec<VariantConfiguration>,
        existing: i64,
        stored: &mut Vec<String>,
    ) -> AppResult<Vec<DesignVariant>> {
        let mut created = Vec::with_capacity(expansions.len());

        for (offset, configuration) in (1_i64..).zip(expansions) {
            let preview = session.apply(&configuration, assets);
            let key = format!(
                "previews/{}/{}.svg",
                template.item_id,
                uuid::Uuid::now_v7()
            );
            let preview_ref = self
                .store
                .put(&key, preview.into_bytes(), PREVIEW_CONTENT_TYPE)
                .await?;
            stored.push(preview_ref.clone());

            let configuration = serde_json::to_value(&configuration)
                .map_err(|e| AppError::InternalError(e.to_string()))?;

            let variant = DesignVariantRepo::create(
                tx,
                &CreateDesignVariant {
                    item_id: template.item_id,
                    template_id: template.id,
                    name: variant_name(&template.name, existing + offset),
                    configuration,
                    preview_artifact_ref: preview_ref,
                },
            )
            .await?;
            created.push(variant);
        }

        Ok(created)
    }

    /// Toggle a variant between `preview` and `selected`.
    pub async fn select(&self, id: DbId, selected: bool) -> AppResult<DesignVariant> {
        let target = if selected {
            DesignVariantStatus::Selected
        } else {
            DesignVariantStatus::Preview
        };

        let moved = DesignVariantRepo::transition(&self.pool, id, &SELECTABLE, target).await?;
        if let Some(variant) = moved {
            return Ok(variant);
        }

        let variant = self.get(id).await?;
        let status = variant.status().map_or("unknown", DesignVariantStatus::name);
        Err(CoreError::Conflict(format!(
            "Variant {id} is {status} and cannot be {}",
            if selected { "selected" } else { "deselected" }
        ))
        .into())
    }

    pub async fn get(&self, id: DbId) -> AppResult<DesignVariant> {
        DesignVariantRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| not_found("DesignVariant", id))
    }

    pub async fn list(&self, item_id: DbId) -> AppResult<Vec<DesignVariant>> {
        Ok(DesignVariantRepo::list_by_item(&self.pool, item_id).await?)
    }

    /// Delete one variant and its preview. Instructions that referenced it
    /// are kept as orphans.
    pub async fn delete(&self, id: DbId) -> AppResult<()> {
        let variant = DesignVariantRepo::delete(&self.pool, id)
            .await?
            .ok_or_else(|| not_found("DesignVariant", id))?;

        self.discard_artifacts(&[variant.preview_artifact_ref]).await;
        tracing::info!(variant_id = id, item_id = variant.item_id, "Deleted design variant");
        Ok(())
    }

    /// Delete every variant of an item. Returns how many were removed.
    pub async fn delete_all(&self, item_id: DbId) -> AppResult<usize> {
        let removed = DesignVariantRepo::delete_all_for_item(&self.pool, item_id).await?;
        let refs: Vec<String> = removed
            .into_iter()
            .map(|v| v.preview_artifact_ref)
            .collect();

        self.discard_artifacts(&refs).await;
        tracing::info!(item_id, count = refs.len(), "Deleted all design variants of item");
        Ok(refs.len())
    }

    /// Editable layers of a template's vector source.
    pub async fn editable_layers(&self, template_id: DbId) -> AppResult<Vec<EditableLayer>> {
        let template = self.template(template_id).await?;
        let source = vector_source(&template)?;
        let parsed = self.template_cache.get_or_parse(template.id, source)?;
        Ok(parsed.layers.clone())
    }

    async fn template(&self, id: DbId) -> AppResult<DesignTemplate> {
        self.catalog
            .find_template(id)
            .await?
            .ok_or_else(|| not_found("DesignTemplate", id))
    }

    /// Best-effort removal; failures are logged and otherwise ignored.
    async fn discard_artifacts(&self, refs: &[String]) {
        let results =
            futures::future::join_all(refs.iter().map(|r| self.store.delete(r))).await;
        for (artifact_ref, result) in refs.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(artifact_ref, error = %e, "Failed to delete artifact");
            }
        }
    }
}

fn vector_source(template: &DesignTemplate) -> AppResult<&str> {
    template
        .vector_source
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            AppError::BadRequest(format!("Template {} has no vector source", template.id))
        })
}

fn not_found(entity: &'static str, id: DbId) -> AppError {
    CoreError::NotFound { entity, id }.into()
}
