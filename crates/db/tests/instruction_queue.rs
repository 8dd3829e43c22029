//! Queue behaviour against a real database.

use kitforge_db::models::design_variant::CreateDesignVariant;
use kitforge_db::models::status::{DesignVariantStatus, InstructionStatus};
use kitforge_db::repositories::{DesignInstructionRepo, DesignVariantRepo};
use sqlx::PgPool;

async fn seed_variant(pool: &PgPool) -> i64 {
    let (template_id,): (i64,) = sqlx::query_as(
        "INSERT INTO design_templates (item_id, name, vector_source, master_document_url) \
         VALUES (7, 'Home', '<svg/>', 'https://files/home.ai') RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let mut tx = pool.begin().await.unwrap();
    let variant = DesignVariantRepo::create(
        &mut tx,
        &CreateDesignVariant {
            item_id: 7,
            template_id,
            name: "Home #1".into(),
            configuration: serde_json::json!({}),
            preview_artifact_ref: "/artifacts/previews/1.svg".into(),
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
    variant.id
}

async fn enqueue(pool: &PgPool, variant_id: i64, priority: i32) -> i64 {
    let mut tx = pool.begin().await.unwrap();
    let instruction = DesignInstructionRepo::create(
        &mut tx,
        variant_id,
        priority,
        &serde_json::json!({}),
        "https://files/home.ai",
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
    instruction.id
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn claims_by_priority_and_never_twice(pool: PgPool) {
    let variant_id = seed_variant(&pool).await;
    let low = enqueue(&pool, variant_id, 0).await;
    let high = enqueue(&pool, variant_id, 10).await;

    let first = DesignInstructionRepo::claim_pending(&pool, 1).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].id, high);
    assert_eq!(first[0].status(), Some(InstructionStatus::Processing));
    assert!(first[0].claimed_at.is_some());

    let second = DesignInstructionRepo::claim_pending(&pool, 5).await.unwrap();
    assert_eq!(second.iter().map(|i| i.id).collect::<Vec<_>>(), vec![low]);

    assert!(DesignInstructionRepo::claim_pending(&pool, 5)
        .await
        .unwrap()
        .is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failure_returns_variant_to_preview(pool: PgPool) {
    let variant_id = seed_variant(&pool).await;
    let id = enqueue(&pool, variant_id, 0).await;

    DesignInstructionRepo::mark_generating(&pool, id).await.unwrap();
    let variant = DesignVariantRepo::find_by_id(&pool, variant_id).await.unwrap().unwrap();
    assert_eq!(variant.status(), Some(DesignVariantStatus::Generating));

    DesignInstructionRepo::fail(&pool, id, "tool crashed").await.unwrap();
    let variant = DesignVariantRepo::find_by_id(&pool, variant_id).await.unwrap().unwrap();
    assert_eq!(variant.status(), Some(DesignVariantStatus::Preview));
    assert_eq!(variant.error_message.as_deref(), Some("tool crashed"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_variant_orphans_instructions(pool: PgPool) {
    let variant_id = seed_variant(&pool).await;
    let id = enqueue(&pool, variant_id, 0).await;

    DesignVariantRepo::delete(&pool, variant_id).await.unwrap();
    let instruction = DesignInstructionRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(instruction.variant_id, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn finished_instruction_ignores_late_failure(pool: PgPool) {
    let variant_id = seed_variant(&pool).await;
    let id = enqueue(&pool, variant_id, 0).await;
    DesignInstructionRepo::mark_generating(&pool, id).await.unwrap();

    let master = "/artifacts/exports/1/master.ai";
    let artifacts = serde_json::json!({ "master": master });
    let completed = DesignInstructionRepo::complete(&pool, id, &artifacts, Some(master))
        .await
        .unwrap();
    assert!(completed.is_some());

    let late = DesignInstructionRepo::fail(&pool, id, "timed out").await.unwrap();
    assert!(late.is_none());

    let instruction = DesignInstructionRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(instruction.status(), Some(InstructionStatus::Completed));
    let variant = DesignVariantRepo::find_by_id(&pool, variant_id).await.unwrap().unwrap();
    assert_eq!(variant.status(), Some(DesignVariantStatus::Generated));
    assert_eq!(variant.error_message, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unclaimed_instruction_cannot_complete(pool: PgPool) {
    let variant_id = seed_variant(&pool).await;
    let id = enqueue(&pool, variant_id, 0).await;

    let artifacts = serde_json::json!({ "vector": "/artifacts/exports/1/vector.svg" });
    let result = DesignInstructionRepo::complete(&pool, id, &artifacts, None)
        .await
        .unwrap();
    assert!(result.is_none());

    let instruction = DesignInstructionRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(instruction.status(), Some(InstructionStatus::Pending));
}
