#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use outreach_api::config::ServerConfig;
use outreach_api::router::build_app_router;
use outreach_api::state::AppState;
use outreach_core::conversation::ConversationFlowManager;
use outreach_core::signing::{signature_header_value, SIGNATURE_HEADER};
use outreach_events::EventBus;
use serde_json::Value;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults and no webhook secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        webhook_secret: None,
    }
}

/// Build the full application router over `pool`.
///
/// Conversations are held by the router's state, so tests that span
/// several requests must clone the same router rather than build a new one.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config())
}

pub fn build_test_app_with(pool: PgPool, config: ServerConfig) -> Router {
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::new(EventBus::default()),
        conversations: Arc::new(Mutex::new(ConversationFlowManager::default())),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body)).await
}

/// POST a raw body, signed with `secret` when one is given.
pub async fn post_signed(
    app: Router,
    uri: &str,
    body: &str,
    secret: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header(SIGNATURE_HEADER, signature_header_value(secret, body.as_bytes()));
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.oneshot(request).await.unwrap()
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Create a consenting prospect through the API and return its id.
pub async fn create_prospect(app: &Router, email: &str) -> i64 {
    let response = post_json(
        app.clone(),
        "/api/v1/prospects",
        serde_json::json!({
            "email": email,
            "first_name": "Jane",
            "company": "Acme",
            "consent_given": true,
        }),
    )
    .await;
    body_json(response).await["id"].as_i64().unwrap()
}

/// Create an email template through the API and return its id.
pub async fn create_template(app: &Router, name: &str) -> i64 {
    let response = post_json(
        app.clone(),
        "/api/v1/templates",
        serde_json::json!({
            "name": name,
            "message_type": "email",
            "subject": "Hi {{first_name}}",
            "content": "Hello {{first_name}} at {{company}}",
        }),
    )
    .await;
    body_json(response).await["id"].as_i64().unwrap()
}

/// Create a draft campaign through the API and return its id.
pub async fn create_campaign(app: &Router, template_id: i64) -> i64 {
    let response = post_json(
        app.clone(),
        "/api/v1/campaigns",
        serde_json::json!({ "name": "Launch", "template_id": template_id }),
    )
    .await;
    body_json(response).await["id"].as_i64().unwrap()
}
