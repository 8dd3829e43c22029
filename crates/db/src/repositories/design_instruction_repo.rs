//! Repository for the `design_instructions` table.
//!
//! Status changes that also move the owning variant run in one
//! transaction, so an instruction and its variant never disagree.

use kitforge_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::design_instruction::DesignInstruction;
use crate::models::status::{InstructionStatus, StatusId};
use crate::repositories::DesignVariantRepo;

/// Column list shared across queries.
const COLUMNS: &str = "id, variant_id, status_id, priority, instructions, master_document_url, \
    artifacts, error_message, claimed_at, started_at, completed_at, created_at, updated_at";

/// Default page size for listings.
const DEFAULT_LIMIT: i64 = 100;

/// Maximum page size for listings.
const MAX_LIMIT: i64 = 500;

/// Provides queue operations over production instructions.
pub struct DesignInstructionRepo;

impl DesignInstructionRepo {
    /// `true` if the variant has a pending or processing instruction.
    pub async fn has_active(
        tx: &mut Transaction<'_, Postgres>,
        variant_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (\
                 SELECT 1 FROM design_instructions \
                 WHERE variant_id = $1 AND status_id IN ($2, $3)\
             )",
        )
        .bind(variant_id)
        .bind(InstructionStatus::Pending.id())
        .bind(InstructionStatus::Processing.id())
        .fetch_one(&mut **tx)
        .await?;
        Ok(exists)
    }

    /// Insert a pending instruction.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        variant_id: DbId,
        priority: i32,
        instructions: &serde_json::Value,
        master_document_url: &str,
    ) -> Result<DesignInstruction, sqlx::Error> {
        let query = format!(
            "INSERT INTO design_instructions \
                (variant_id, status_id, priority, instructions, master_document_url) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DesignInstruction>(&query)
            .bind(variant_id)
            .bind(InstructionStatus::Pending.id())
            .bind(priority)
            .bind(instructions)
            .bind(master_document_url)
            .fetch_one(&mut **tx)
            .await
    }

    /// Move up to `limit` pending instructions to `processing`.
    ///
    /// `FOR UPDATE SKIP LOCKED` keeps concurrent claimers from receiving
    /// the same rows. Results are ordered by priority, then age.
    pub async fn claim_pending(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<DesignInstruction>, sqlx::Error> {
        let query = format!(
            "UPDATE design_instructions \
             SET status_id = $1, claimed_at = NOW() \
             WHERE id IN ( \
                 SELECT id FROM design_instructions \
                 WHERE status_id = $2 \
                 ORDER BY priority DESC, created_at ASC, id ASC \
                 LIMIT $3 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        let mut claimed = sqlx::query_as::<_, DesignInstruction>(&query)
            .bind(InstructionStatus::Processing.id())
            .bind(InstructionStatus::Pending.id())
            .bind(limit)
            .fetch_all(pool)
            .await?;
        claimed.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(claimed)
    }

    /// Record that production started; the variant becomes `generating`.
    pub async fn mark_generating(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<DesignInstruction>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE design_instructions \
             SET status_id = $2, started_at = NOW() \
             WHERE id = $1 AND status_id IN ($2, $3) \
             RETURNING {COLUMNS}"
        );
        let instruction = sqlx::query_as::<_, DesignInstruction>(&query)
            .bind(id)
            .bind(InstructionStatus::Processing.id())
            .bind(InstructionStatus::Pending.id())
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(variant_id) = instruction.as_ref().and_then(|i| i.variant_id) {
            DesignVariantRepo::set_generating(&mut tx, variant_id).await?;
        }

        tx.commit().await?;
        Ok(instruction)
    }

    /// Complete a `processing` instruction and publish its artifacts on the
    /// variant. `None` when the instruction is missing or not processing.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        artifacts: &serde_json::Value,
        final_artifact_ref: Option<&str>,
    ) -> Result<Option<DesignInstruction>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE design_instructions \
             SET status_id = $2, artifacts = $3, error_message = NULL, completed_at = NOW() \
             WHERE id = $1 AND status_id = $4 \
             RETURNING {COLUMNS}"
        );
        let instruction = sqlx::query_as::<_, DesignInstruction>(&query)
            .bind(id)
            .bind(InstructionStatus::Completed.id())
            .bind(artifacts)
            .bind(InstructionStatus::Processing.id())
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(variant_id) = instruction.as_ref().and_then(|i| i.variant_id) {
            DesignVariantRepo::set_generated(&mut tx, variant_id, final_artifact_ref, artifacts)
                .await?;
        }

        tx.commit().await?;
        Ok(instruction)
    }

    /// Fail a `processing` instruction; the variant returns to `preview`
    /// with the message. `None` when the instruction is missing or not
    /// processing, so a late report cannot undo a finished job.
    pub async fn fail(
        pool: &PgPool,
        id: DbId,
        message: &str,
    ) -> Result<Option<DesignInstruction>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE design_instructions \
             SET status_id = $2, error_message = $3, completed_at = NOW() \
             WHERE id = $1 AND status_id = $4 \
             RETURNING {COLUMNS}"
        );
        let instruction = sqlx::query_as::<_, DesignInstruction>(&query)
            .bind(id)
            .bind(InstructionStatus::Failed.id())
            .bind(message)
            .bind(InstructionStatus::Processing.id())
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(variant_id) = instruction.as_ref().and_then(|i| i.variant_id) {
            DesignVariantRepo::set_failed(&mut tx, variant_id, message).await?;
        }

        tx.commit().await?;
        Ok(instruction)
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<DesignInstruction>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM design_instructions WHERE id = $1");
        sqlx::query_as::<_, DesignInstruction>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Number of instructions currently in `status`.
    pub async fn count_in_status(
        pool: &PgPool,
        status: InstructionStatus,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM design_instructions WHERE status_id = $1")
                .bind(status.id())
                .fetch_one(pool)
                .await?;
        Ok(count)
    }

    /// Newest first, optionally filtered by status.
    pub async fn list(
        pool: &PgPool,
        status_id: Option<StatusId>,
        limit: Option<i64>,
    ) -> Result<Vec<DesignInstruction>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let query = format!(
            "SELECT {COLUMNS} FROM design_instructions \
             WHERE ($1::SMALLINT IS NULL OR status_id = $1) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, DesignInstruction>(&query)
            .bind(status_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
