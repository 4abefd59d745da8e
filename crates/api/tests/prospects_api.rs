//! HTTP-level tests for prospect management.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete, get, post_json, put_json};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_prospect_returns_201_and_queues_scoring(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/prospects",
        json!({"email": "  Jane@Example.com ", "first_name": "Jane", "consent_given": true}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["email"], "jane@example.com");
    assert_eq!(json["qualification_score"], 50);
    assert_eq!(json["consent_given"], true);
    assert!(json["consent_timestamp"].is_string());

    let queued: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE job_type = 'score_prospect'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(queued, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_email_returns_409(pool: PgPool) {
    let app = common::build_test_app(pool);
    common::create_prospect(&app, "dup@example.com").await;

    let response = post_json(
        app,
        "/api/v1/prospects",
        json!({"email": "DUP@example.com", "consent_given": false}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_email_returns_400(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(app, "/api/v1/prospects", json!({"email": "not-an-email"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_status_filter_returns_400(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/prospects?status=bogus").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn status_filter_and_bulk_update(pool: PgPool) {
    let app = common::build_test_app(pool);
    let a = common::create_prospect(&app, "a@example.com").await;
    let b = common::create_prospect(&app, "b@example.com").await;
    common::create_prospect(&app, "c@example.com").await;

    let response = post_json(
        app.clone(),
        "/api/v1/prospects/bulk-update",
        json!({"prospect_ids": [a, b], "status": "qualified"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["updated"], 2);

    let response = get(app, "/api/v1/prospects?status=qualified").await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unsubscribe_revokes_consent(pool: PgPool) {
    let app = common::build_test_app(pool);
    let id = common::create_prospect(&app, "leave@example.com").await;

    let response = delete(app.clone(), &format!("/api/v1/prospects/{id}/unsubscribe")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["consent_given"], false);

    let response = put_json(
        app,
        &format!("/api/v1/prospects/{id}/consent"),
        json!({"consent_given": true}),
    )
    .await;
    assert_eq!(body_json(response).await["consent_given"], true);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_prospect_returns_204_then_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let id = common::create_prospect(&app, "gone@example.com").await;

    let response = delete(app.clone(), &format!("/api/v1/prospects/{id}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(app.clone(), &format!("/api/v1/prospects/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = delete(app, &format!("/api/v1/prospects/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rescore_returns_202_with_job(pool: PgPool) {
    let app = common::build_test_app(pool);
    let id = common::create_prospect(&app, "score@example.com").await;

    let response = post_json(app, &format!("/api/v1/prospects/{id}/score"), json!({})).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["prospect_id"], id);
    assert!(json["job_id"].is_number());
}
