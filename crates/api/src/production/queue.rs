//! Production instruction queue.
//!
//! Instructions move `pending -> processing -> completed | failed`. The
//! owning variant follows along (`generating`, `generated`, or back to
//! `preview` on failure) in the same transaction as the instruction.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use kitforge_core::customize::{AssetRequest, VariantConfiguration};
use kitforge_core::error::CoreError;
use kitforge_core::production::{
    clamp_claim_limit, plan_enqueue, primary_artifact, ArtifactMap, ExportFormat,
    InstructionSnapshot,
};
use kitforge_core::types::DbId;
use kitforge_db::models::design_instruction::{
    DesignInstruction, DesignInstructionView, EnqueueResult, UpdateInstructionStatus,
};
use kitforge_db::models::design_variant::DesignVariant;
use kitforge_db::models::status::{DesignVariantStatus, InstructionStatus};
use kitforge_db::repositories::{DesignInstructionRepo, DesignVariantRepo};
use kitforge_db::DbPool;
use serde::Serialize;

use crate::catalog::DesignCatalog;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage::ArtifactStore;

/// Message recorded when a failure report carries none.
const DEFAULT_FAILURE_MESSAGE: &str = "Production failed";

/// Response of an artifact upload.
#[derive(Debug, Clone, Serialize)]
pub struct StoredArtifact {
    pub format: ExportFormat,
    pub artifact_ref: String,
}

/// A variant that passed the enqueue checks, with its frozen inputs.
struct Prepared {
    snapshot: serde_json::Value,
    master_document_url: String,
}

pub struct ProductionQueue {
    pool: DbPool,
    catalog: Arc<dyn DesignCatalog>,
    store: Arc<dyn ArtifactStore>,
}

impl ProductionQueue {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            catalog: Arc::clone(&state.catalog),
            store: Arc::clone(&state.store),
        }
    }

    /// Create pending instructions for the given variants.
    ///
    /// Variants that are missing, already generating, already queued, or
    /// whose template has no master document are skipped. A repeated id
    /// counts once.
    pub async fn enqueue(&self, variant_ids: &[DbId], priority: i32) -> AppResult<EnqueueResult> {
        let mut tx = self.pool.begin().await?;

        // Lock in id order so concurrent requests cannot deadlock.
        let unique: BTreeSet<DbId> = variant_ids.iter().copied().collect();
        let mut prepared: HashMap<DbId, Prepared> = HashMap::new();

        for id in unique {
            let Some(variant) = DesignVariantRepo::lock_for_update(&mut tx, id).await? else {
                tracing::debug!(variant_id = id, "Skipping unknown variant");
                continue;
            };
            if variant.status() == Some(DesignVariantStatus::Generating) {
                tracing::debug!(variant_id = id, "Skipping variant already generating");
                continue;
            }
            if DesignInstructionRepo::has_active(&mut tx, id).await? {
                tracing::debug!(variant_id = id, "Skipping variant with active instruction");
                continue;
            }
            if let Some(ready) = self.prepare(&variant).await? {
                prepared.insert(id, ready);
            }
        }

        let plan = plan_enqueue(variant_ids, |id| prepared.contains_key(&id));

        let mut instructions = Vec::with_capacity(plan.create.len());
        for id in &plan.create {
            let Some(ready) = prepared.remove(id) else {
                continue;
            };
            let instruction = DesignInstructionRepo::create(
                &mut tx,
                *id,
                priority,
                &ready.snapshot,
                &ready.master_document_url,
            )
            .await?;
            instructions.push(DesignInstructionView::from(instruction));
        }

        tx.commit().await?;

        tracing::info!(
            created = instructions.len(),
            skipped = plan.skipped.len(),
            priority,
            "Enqueued design instructions",
        );

        Ok(EnqueueResult {
            created: instructions.len(),
            skipped: plan.skipped.len(),
            instructions,
        })
    }

    /// Freeze the configuration, resolved assets and master document URL.
    async fn prepare(&self, variant: &DesignVariant) -> AppResult<Option<Prepared>> {
        let Some(template) = self.catalog.find_template(variant.template_id).await? else {
            tracing::warn!(
                variant_id = variant.id,
                template_id = variant.template_id,
                "Skipping variant whose template no longer exists",
            );
            return Ok(None);
        };
        let Some(master_document_url) = template.master_document_url.filter(|u| !u.is_empty())
        else {
            tracing::warn!(
                variant_id = variant.id,
                template_id = template.id,
                "Skipping variant whose template has no master document",
            );
            return Ok(None);
        };

        let configuration: VariantConfiguration =
            serde_json::from_value(variant.configuration.clone()).map_err(|e| {
                AppError::InternalError(format!(
                    "Stored configuration of variant {} is unreadable: {e}",
                    variant.id
                ))
            })?;
        let assets = self
            .catalog
            .resolve_assets(&AssetRequest::for_configuration(&configuration))
            .await?;

        let snapshot = InstructionSnapshot {
            variant_name: variant.name.clone(),
            template_id: template.id,
            configuration,
            assets,
        };
        let snapshot =
            serde_json::to_value(&snapshot).map_err(|e| AppError::InternalError(e.to_string()))?;

        Ok(Some(Prepared {
            snapshot,
            master_document_url,
        }))
    }

    /// Claim up to `limit` pending instructions for a bridge.
    pub async fn claim_pending(&self, limit: Option<i64>) -> AppResult<Vec<DesignInstruction>> {
        let limit = clamp_claim_limit(limit);
        let claimed = DesignInstructionRepo::claim_pending(&self.pool, limit).await?;
        if !claimed.is_empty() {
            tracing::info!(count = claimed.len(), limit, "Claimed design instructions");
        }
        Ok(claimed)
    }

    pub async fn mark_generating(&self, id: DbId) -> AppResult<DesignInstruction> {
        match DesignInstructionRepo::mark_generating(&self.pool, id).await? {
            Some(instruction) => {
                tracing::info!(job_id = id, variant_id = ?instruction.variant_id, "Production started");
                Ok(instruction)
            }
            None => Err(self.rejected_transition(id, "start production").await),
        }
    }

    /// Record success. The variant's final ref is the primary artifact.
    /// Only `processing` instructions can complete.
    pub async fn mark_completed(
        &self,
        id: DbId,
        artifacts: &ArtifactMap,
    ) -> AppResult<DesignInstruction> {
        let Some(primary) = primary_artifact(artifacts) else {
            return Err(CoreError::Validation(
                "A completed instruction needs at least one artifact".into(),
            )
            .into());
        };
        let value =
            serde_json::to_value(artifacts).map_err(|e| AppError::InternalError(e.to_string()))?;

        let Some(instruction) =
            DesignInstructionRepo::complete(&self.pool, id, &value, Some(primary)).await?
        else {
            return Err(self.rejected_transition(id, "be completed").await);
        };

        tracing::info!(
            job_id = id,
            variant_id = ?instruction.variant_id,
            formats = artifacts.len(),
            "Production completed",
        );
        Ok(instruction)
    }

    pub async fn mark_failed(&self, id: DbId, message: &str) -> AppResult<DesignInstruction> {
        let Some(instruction) = DesignInstructionRepo::fail(&self.pool, id, message).await? else {
            return Err(self.rejected_transition(id, "be failed").await);
        };

        tracing::warn!(
            job_id = id,
            variant_id = ?instruction.variant_id,
            error = message,
            "Production failed",
        );
        Ok(instruction)
    }

    /// 404 for an unknown instruction, otherwise 409 naming its current
    /// status.
    async fn rejected_transition(&self, id: DbId, action: &str) -> AppError {
        match self.get(id).await {
            Ok(current) => {
                let status = current.status().map_or("unknown", InstructionStatus::name);
                CoreError::Conflict(format!("Instruction {id} is {status} and cannot {action}"))
                    .into()
            }
            Err(e) => e,
        }
    }

    /// Apply a status report from a bridge.
    pub async fn apply_update(
        &self,
        id: DbId,
        update: UpdateInstructionStatus,
    ) -> AppResult<DesignInstruction> {
        match InstructionStatus::from_name(&update.status) {
            Some(InstructionStatus::Processing) => self.mark_generating(id).await,
            Some(InstructionStatus::Completed) => {
                self.mark_completed(id, &update.artifacts.unwrap_or_default())
                    .await
            }
            Some(InstructionStatus::Failed) => {
                let message = update
                    .error_message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
                self.mark_failed(id, &message).await
            }
            Some(InstructionStatus::Pending) | None => Err(AppError::BadRequest(format!(
                "Unsupported instruction status '{}'",
                update.status
            ))),
        }
    }

    /// Store one uploaded export and return its ref.
    pub async fn store_artifact(
        &self,
        id: DbId,
        format: ExportFormat,
        bytes: Vec<u8>,
    ) -> AppResult<StoredArtifact> {
        if bytes.is_empty() {
            return Err(CoreError::Validation(format!("Uploaded {format} file is empty")).into());
        }
        // 404 for unknown instructions before anything is written.
        self.get(id).await?;

        let key = format!("exports/{id}/{}.{}", format.as_str(), format.extension());
        let size = bytes.len();
        let artifact_ref = self.store.put(&key, bytes, format.content_type()).await?;

        tracing::info!(job_id = id, %format, size, "Stored production artifact");
        Ok(StoredArtifact {
            format,
            artifact_ref,
        })
    }

    pub async fn get(&self, id: DbId) -> AppResult<DesignInstruction> {
        DesignInstructionRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Instructions for operators, optionally filtered by status name.
    pub async fn list(
        &self,
        status: Option<&str>,
        limit: Option<i64>,
    ) -> AppResult<Vec<DesignInstruction>> {
        let status_id = match status {
            Some(name) => Some(
                InstructionStatus::from_name(name)
                    .ok_or_else(|| {
                        CoreError::Validation(format!("Unknown instruction status '{name}'"))
                    })?
                    .id(),
            ),
            None => None,
        };
        Ok(DesignInstructionRepo::list(&self.pool, status_id, limit).await?)
    }
}

fn not_found(id: DbId) -> AppError {
    CoreError::NotFound {
        entity: "DesignInstruction",
        id,
    }
    .into()
}
