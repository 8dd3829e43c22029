//! Production instruction endpoints against a real database.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{body_json, get, patch_json, post, post_file, post_json, seed_template, JERSEY_SVG};
use serde_json::json;
use sqlx::PgPool;

async fn generate_one(app: &Router, template_id: i64) -> i64 {
    let json = body_json(
        post_json(
            app.clone(),
            "/api/v1/variants/generate",
            json!({ "template_id": template_id, "config": {} }),
        )
        .await,
    )
    .await;
    json["data"][0]["id"].as_i64().unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn enqueue_skips_duplicates_and_queued_variants(pool: PgPool) {
    let artifacts = tempfile::tempdir().unwrap();
    let template_id = seed_template(&pool, 7, Some(JERSEY_SVG)).await;
    let app = common::build_test_app(pool, artifacts.path());
    let variant_id = generate_one(&app, template_id).await;

    let response = post_json(
        app.clone(),
        "/api/v1/bridge/jobs",
        json!({ "variant_ids": [variant_id, variant_id, 424242], "priority": 3 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["created"], 1);
    assert_eq!(json["data"]["skipped"], 2);
    let instruction = &json["data"]["instructions"][0];
    assert_eq!(instruction["status"], "pending");
    assert_eq!(instruction["priority"], 3);
    assert_eq!(
        instruction["master_document_url"],
        "https://files.example/home.ai"
    );
    assert_eq!(instruction["instructions"]["variant_name"], "Home #1");

    // Already has a pending instruction.
    let json = body_json(
        post_json(
            app,
            "/api/v1/bridge/jobs",
            json!({ "variant_ids": [variant_id] }),
        )
        .await,
    )
    .await;
    assert_eq!(json["data"]["created"], 0);
    assert_eq!(json["data"]["skipped"], 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn claim_upload_and_complete(pool: PgPool) {
    let artifacts = tempfile::tempdir().unwrap();
    let template_id = seed_template(&pool, 7, Some(JERSEY_SVG)).await;
    let app = common::build_test_app(pool, artifacts.path());
    let variant_id = generate_one(&app, template_id).await;

    post_json(
        app.clone(),
        "/api/v1/bridge/jobs",
        json!({ "variant_ids": [variant_id] }),
    )
    .await;

    let claimed = body_json(post(app.clone(), "/api/v1/design-instructions/claim?limit=5").await).await;
    let jobs = claimed["data"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["status"], "processing");
    let id = jobs[0]["id"].as_i64().unwrap();

    let again = body_json(post(app.clone(), "/api/v1/design-instructions/claim").await).await;
    assert!(again["data"].as_array().unwrap().is_empty());

    let uri = format!("/api/v1/design-instructions/{id}");
    let response = patch_json(app.clone(), &uri, json!({ "status": "processing" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let variant = body_json(get(app.clone(), &format!("/api/v1/variants/{variant_id}")).await).await;
    assert_eq!(variant["data"]["status"], "generating");

    let response = post_file(
        app.clone(),
        &format!("{uri}/artifacts/ai"),
        "home.ai",
        b"%!PS-Adobe",
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let stored = body_json(response).await;
    assert_eq!(stored["data"]["format"], "master");
    let master_ref = stored["data"]["artifact_ref"].as_str().unwrap().to_string();

    let response = patch_json(
        app.clone(),
        &uri,
        json!({ "status": "completed", "artifacts": { "master": master_ref } }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "completed");

    // A late failure report cannot undo a finished job.
    let response = patch_json(
        app.clone(),
        &uri,
        json!({ "status": "failed", "error_message": "timed out" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");

    let variant = body_json(get(app, &format!("/api/v1/variants/{variant_id}")).await).await;
    assert_eq!(variant["data"]["status"], "generated");
    assert_eq!(variant["data"]["final_artifact_ref"], master_ref.as_str());
    assert!(variant["data"]["error_message"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unclaimed_instruction_cannot_be_completed(pool: PgPool) {
    let artifacts = tempfile::tempdir().unwrap();
    let template_id = seed_template(&pool, 7, Some(JERSEY_SVG)).await;
    let app = common::build_test_app(pool, artifacts.path());
    let variant_id = generate_one(&app, template_id).await;

    let queued = body_json(
        post_json(
            app.clone(),
            "/api/v1/bridge/jobs",
            json!({ "variant_ids": [variant_id] }),
        )
        .await,
    )
    .await;
    let id = queued["data"]["instructions"][0]["id"].as_i64().unwrap();

    let response = patch_json(
        app.clone(),
        &format!("/api/v1/design-instructions/{id}"),
        json!({ "status": "completed", "artifacts": { "vector": "/artifacts/x.svg" } }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = patch_json(
        app,
        "/api/v1/design-instructions/424242",
        json!({ "status": "failed" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failure_report_returns_variant_to_preview(pool: PgPool) {
    let artifacts = tempfile::tempdir().unwrap();
    let template_id = seed_template(&pool, 7, Some(JERSEY_SVG)).await;
    let app = common::build_test_app(pool, artifacts.path());
    let variant_id = generate_one(&app, template_id).await;

    post_json(
        app.clone(),
        "/api/v1/bridge/jobs",
        json!({ "variant_ids": [variant_id] }),
    )
    .await;
    let claimed = body_json(post(app.clone(), "/api/v1/design-instructions/claim").await).await;
    let id = claimed["data"][0]["id"].as_i64().unwrap();

    let response = patch_json(
        app.clone(),
        &format!("/api/v1/design-instructions/{id}"),
        json!({ "status": "failed", "error_message": "Design tool exited with code 1" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let variant = body_json(get(app.clone(), &format!("/api/v1/variants/{variant_id}")).await).await;
    assert_eq!(variant["data"]["status"], "preview");
    assert_eq!(
        variant["data"]["error_message"],
        "Design tool exited with code 1"
    );

    let failed = body_json(get(app, "/api/v1/design-instructions?status=failed").await).await;
    assert_eq!(failed["data"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_export_format_is_rejected(pool: PgPool) {
    let artifacts = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool, artifacts.path());

    let response = post_file(
        app,
        "/api/v1/design-instructions/1/artifacts/docx",
        "x.docx",
        b"data",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
