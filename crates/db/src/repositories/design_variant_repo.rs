//! Repository for the `design_variants` table.
//!
//! Generation runs inside a transaction holding the item's advisory lock,
//! so the count-then-insert of the per-item ceiling cannot race.

use kitforge_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::design_variant::{CreateDesignVariant, DesignVariant};
use crate::models::status::{DesignVariantStatus, StatusId};

/// Column list shared across queries.
pub(crate) const COLUMNS: &str = "id, item_id, template_id, name, configuration, \
    preview_artifact_ref, final_artifact_ref, final_artifacts, status_id, error_message, \
    created_at, updated_at";

/// Provides CRUD operations for design variants.
pub struct DesignVariantRepo;

impl DesignVariantRepo {
    /// Serialize variant generation per item until the transaction ends.
    pub async fn lock_item(
        tx: &mut Transaction<'_, Postgres>,
        item_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(item_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn count_for_item(
        tx: &mut Transaction<'_, Postgres>,
        item_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM design_variants WHERE item_id = $1")
                .bind(item_id)
                .fetch_one(&mut **tx)
                .await?;
        Ok(count)
    }

    /// Insert a new variant in `preview`.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        input: &CreateDesignVariant,
    ) -> Result<DesignVariant, sqlx::Error> {
        let query = format!(
            "INSERT INTO design_variants \
                (item_id, template_id, name, configuration, preview_artifact_ref, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DesignVariant>(&query)
            .bind(input.item_id)
            .bind(input.template_id)
            .bind(&input.name)
            .bind(&input.configuration)
            .bind(&input.preview_artifact_ref)
            .bind(DesignVariantStatus::Preview.id())
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<DesignVariant>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM design_variants WHERE id = $1");
        sqlx::query_as::<_, DesignVariant>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Variants of an item, oldest first.
    pub async fn list_by_item(
        pool: &PgPool,
        item_id: DbId,
    ) -> Result<Vec<DesignVariant>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM design_variants \
             WHERE item_id = $1 \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, DesignVariant>(&query)
            .bind(item_id)
            .fetch_all(pool)
            .await
    }

    /// Move a variant to `to` only if its current status is one of `from`.
    ///
    /// Returns `None` when the variant does not exist or is in another
    /// status; callers tell the two apart with [`Self::find_by_id`].
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        from: &[DesignVariantStatus],
        to: DesignVariantStatus,
    ) -> Result<Option<DesignVariant>, sqlx::Error> {
        let from: Vec<StatusId> = from.iter().map(|s| s.id()).collect();
        let query = format!(
            "UPDATE design_variants SET status_id = $2 \
             WHERE id = $1 AND status_id = ANY($3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DesignVariant>(&query)
            .bind(id)
            .bind(to.id())
            .bind(&from)
            .fetch_optional(pool)
            .await
    }

    /// Delete one variant, returning the removed row.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<Option<DesignVariant>, sqlx::Error> {
        let query = format!("DELETE FROM design_variants WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, DesignVariant>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Delete every variant of an item, returning the removed rows.
    pub async fn delete_all_for_item(
        pool: &PgPool,
        item_id: DbId,
    ) -> Result<Vec<DesignVariant>, sqlx::Error> {
        let query =
            format!("DELETE FROM design_variants WHERE item_id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, DesignVariant>(&query)
            .bind(item_id)
            .fetch_all(pool)
            .await
    }

    /// Row-lock a variant for the rest of the transaction.
    pub async fn lock_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<DesignVariant>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM design_variants WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, DesignVariant>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn set_generating(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE design_variants SET status_id = $2, error_message = NULL WHERE id = $1")
            .bind(id)
            .bind(DesignVariantStatus::Generating.id())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub(crate) async fn set_generated(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        final_artifact_ref: Option<&str>,
        final_artifacts: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE design_variants \
             SET status_id = $2, final_artifact_ref = $3, final_artifacts = $4, \
                 error_message = NULL \
             WHERE id = $1",
        )
        .bind(id)
        .bind(DesignVariantStatus::Generated.id())
        .bind(final_artifact_ref)
        .bind(final_artifacts)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub(crate) async fn set_failed(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        message: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE design_variants SET status_id = $2, error_message = $3 WHERE id = $1")
            .bind(id)
            .bind(DesignVariantStatus::Preview.id())
            .bind(message)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
