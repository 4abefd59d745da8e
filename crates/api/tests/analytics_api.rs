//! HTTP-level tests for response and campaign analytics.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_signed};
use outreach_db::models::message_log::NewMessageLog;
use outreach_db::models::status::MessageStatus;
use outreach_db::repositories::MessageLogRepo;
use serde_json::json;
use sqlx::PgPool;

async fn log(pool: &PgPool, prospect: i64, campaign: i64, status: MessageStatus) -> i64 {
    MessageLogRepo::create(
        pool,
        &NewMessageLog {
            prospect_id: prospect,
            campaign_id: Some(campaign),
            template_id: None,
            message_type: "email".to_string(),
            subject: None,
            content: "Hello".to_string(),
            step_number: Some(1),
            status_id: status.id(),
            ab_test_variant: None,
            metadata: json!({}),
        },
    )
    .await
    .unwrap()
    .id
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn days_out_of_range_returns_400(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app.clone(), "/api/v1/analytics/responses?days=0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = get(app, "/api/v1/analytics/responses?days=366").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn empty_window_has_zero_rates(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/analytics/responses").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total_messages"], 0);
    assert_eq!(json["open_rate"], 0.0);
    assert_eq!(json["avg_response_time_hours"], 0.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rates_follow_tracked_engagement(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let prospect = common::create_prospect(&app, "stats@example.com").await;
    let template = common::create_template(&app, "Intro").await;
    let campaign = common::create_campaign(&app, template).await;

    let first = log(&pool, prospect, campaign, MessageStatus::Sent).await;
    let second = log(&pool, prospect, campaign, MessageStatus::Sent).await;
    log(&pool, prospect, campaign, MessageStatus::Bounced).await;
    log(&pool, prospect, campaign, MessageStatus::Sent).await;
    log(&pool, prospect, campaign, MessageStatus::Sent).await;

    post_signed(app.clone(), &format!("/api/v1/webhooks/messages/{first}/open"), "", None).await;
    post_signed(app.clone(), &format!("/api/v1/webhooks/messages/{second}/open"), "", None).await;
    post_signed(
        app.clone(),
        &format!("/api/v1/webhooks/messages/{first}/reply"),
        r#"{"content": "Yes", "sentiment_score": 0.9}"#,
        None,
    )
    .await;

    let response = get(
        app.clone(),
        &format!("/api/v1/analytics/responses?campaign_id={campaign}&days=7"),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["total_messages"], 4);
    assert_eq!(json["opens"], 2);
    assert_eq!(json["open_rate"], 50.0);
    assert_eq!(json["replies"], 1);
    assert_eq!(json["reply_rate"], 25.0);
    assert_eq!(json["positive_replies"], 1);

    let response = get(app, &format!("/api/v1/analytics/campaigns/{campaign}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "draft");
    assert_eq!(json["total_messages"], 5);
    assert_eq!(json["sent"], 4);
    assert_eq!(json["bounced"], 1);
    assert_eq!(json["delivery_rate"], 80.0);
    assert_eq!(json["open_rate"], 50.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_campaign_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/analytics/campaigns/999999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
