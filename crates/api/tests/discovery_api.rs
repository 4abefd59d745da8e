//! HTTP-level tests for discovery task submission and cancellation.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete, get, post_json};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn submit_returns_202_with_pending_task(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app.clone(),
        "/api/v1/discovery/tasks",
        json!({
            "kind": "profile",
            "platform": "twitter",
            "priority": "critical",
            "target": {"url": "https://twitter.com/jane"},
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "pending");
    assert_eq!(json["payload"]["kind"], "profile");
    let id = json["id"].as_i64().unwrap();

    let priority: i16 = sqlx::query_scalar("SELECT priority FROM jobs WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(priority, 4);

    let json = body_json(get(app, &format!("/api/v1/discovery/tasks/{id}")).await).await;
    assert_eq!(json["discovered"].as_array().unwrap().len(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_kind_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/discovery/tasks",
        json!({"kind": "telepathy", "platform": "twitter"}),
    )
    .await;
    assert!(response.status().is_client_error());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn dependencies_must_be_discovery_tasks(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/discovery/tasks",
        json!({"kind": "network", "platform": "linkedin", "dependencies": [999999]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancel_returns_204_then_409(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app.clone(),
        "/api/v1/discovery/tasks",
        json!({"kind": "content", "platform": "reddit"}),
    )
    .await;
    let id = body_json(response).await["id"].as_i64().unwrap();
    let uri = format!("/api/v1/discovery/tasks/{id}");

    let response = delete(app.clone(), &uri).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let json = body_json(get(app.clone(), &uri).await).await;
    assert_eq!(json["status"], "cancelled");

    let response = delete(app, &uri).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn other_jobs_are_not_discovery_tasks(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    common::create_prospect(&app, "jobs@example.com").await;
    let score_job: i64 = sqlx::query_scalar("SELECT id FROM jobs WHERE job_type = 'score_prospect'")
        .fetch_one(&pool)
        .await
        .unwrap();

    let response = get(app, &format!("/api/v1/discovery/tasks/{score_job}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
