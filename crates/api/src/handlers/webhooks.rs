//! Inbound tracking webhooks and outbound webhook subscriptions.
//!
//! Delivery providers report opens, clicks and replies to
//! `POST /webhooks/messages/{id}/{event}`. When `WEBHOOK_SECRET` is set the
//! raw body must carry a valid `X-Webhook-Signature`.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use outreach_core::error::CoreError;
use outreach_core::responses::{classify_reply, ReplyOutcome};
use outreach_core::signing::{generate_webhook_secret, verify_webhook_signature, SIGNATURE_HEADER};
use outreach_core::types::DbId;
use outreach_core::validation::validate_webhook_url;
use outreach_db::models::ab_test::AbCounter;
use outreach_db::models::message_log::MessageLog;
use outreach_db::models::status::ProspectStatus;
use outreach_db::models::webhook::{CreateWebhookSubscription, CreatedWebhookSubscription};
use outreach_db::repositories::{AbTestRepo, MessageLogRepo, ProspectRepo, WebhookRepo};
use outreach_events::{event_types, PlatformEvent};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Engagement reported for a sent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingEvent {
    Open,
    Click,
    Reply,
}

impl TrackingEvent {
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        match name {
            "open" => Ok(TrackingEvent::Open),
            "click" => Ok(TrackingEvent::Click),
            "reply" => Ok(TrackingEvent::Reply),
            other => Err(CoreError::validation(format!(
                "Unknown tracking event '{other}'. Must be one of: open, click, reply"
            ))),
        }
    }

    fn counter(self) -> AbCounter {
        match self {
            TrackingEvent::Open => AbCounter::Opened,
            TrackingEvent::Click => AbCounter::Clicked,
            TrackingEvent::Reply => AbCounter::Replied,
        }
    }

    fn event_type(self) -> &'static str {
        match self {
            TrackingEvent::Open => event_types::MESSAGE_OPENED,
            TrackingEvent::Click => event_types::MESSAGE_CLICKED,
            TrackingEvent::Reply => event_types::MESSAGE_REPLIED,
        }
    }
}

/// Optional body of an inbound tracking webhook.
#[derive(Debug, Default, Deserialize)]
pub struct TrackingPayload {
    /// Reply text.
    pub content: Option<String>,
    /// Sentiment of the reply in `[-1, 1]`, computed upstream.
    pub sentiment_score: Option<f64>,
}

/// POST /api/v1/webhooks/messages/{id}/{event}
///
/// Records the event on the message log. Repeated events are accepted but
/// only the first one counts towards A/B results.
pub async fn track_message_event(
    State(state): State<AppState>,
    Path((id, event)): Path<(DbId, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    if let Some(secret) = &state.config.webhook_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_webhook_signature(secret, &body, signature) {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid webhook signature".into(),
            )));
        }
    }

    let event = TrackingEvent::parse(&event)?;
    let payload: TrackingPayload = if body.iter().all(u8::is_ascii_whitespace) {
        TrackingPayload::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid tracking payload: {e}")))?
    };

    let tracked = match event {
        TrackingEvent::Open => MessageLogRepo::mark_opened(&state.pool, id).await?,
        TrackingEvent::Click => MessageLogRepo::mark_clicked(&state.pool, id).await?,
        TrackingEvent::Reply => {
            MessageLogRepo::mark_replied(&state.pool, id, payload.sentiment_score).await?
        }
    }
    .ok_or(AppError::Core(CoreError::NotFound { entity: "MessageLog", id }))?;
    let (log, first) = (tracked.log, tracked.first_event);

    if first {
        if let (Some(variant), Some(campaign_id)) = (&log.ab_test_variant, log.campaign_id) {
            AbTestRepo::increment_for_campaign(&state.pool, campaign_id, variant, event.counter())
                .await?;
        }
    }

    let mut event_payload = json!({
        "prospect_id": log.prospect_id,
        "campaign_id": log.campaign_id,
        "message_type": log.message_type,
    });
    if event == TrackingEvent::Reply {
        let outcome = classify_reply(payload.sentiment_score);
        let conversation_state = record_reply(&state, &log, &payload, outcome).await?;
        event_payload["outcome"] = json!(outcome);
        event_payload["sentiment_score"] = json!(payload.sentiment_score);
        event_payload["conversation_state"] = json!(conversation_state);
    }

    state.event_bus.publish(
        PlatformEvent::new(event.event_type())
            .with_source("message_log", log.id)
            .with_payload(event_payload),
    );
    tracing::info!(message_id = id, event = event.event_type(), first, "Tracking event recorded");

    Ok(Json(log))
}

/// Move the prospect to the status the reply implies and advance their
/// open conversation. Returns the conversation's new state, if any.
async fn record_reply(
    state: &AppState,
    log: &MessageLog,
    payload: &TrackingPayload,
    outcome: ReplyOutcome,
) -> AppResult<Option<String>> {
    let target = ProspectStatus::for_reply(outcome);
    if let Some(before) = ProspectRepo::find_by_id(&state.pool, log.prospect_id).await? {
        if before.status_id != target.id() {
            ProspectRepo::update_status(&state.pool, log.prospect_id, target).await?;
            state.event_bus.publish(
                PlatformEvent::new(event_types::PROSPECT_STATUS_CHANGED)
                    .with_source("prospect", log.prospect_id)
                    .with_payload(json!({
                        "from": ProspectStatus::from_id(before.status_id).map(ProspectStatus::name),
                        "to": target.name(),
                        "email": before.email,
                    })),
            );
        }
    }

    let mut conversations = state.conversations.lock().await;
    let Some(conversation_id) = conversations.active_for_prospect(log.prospect_id) else {
        return Ok(None);
    };
    let content = payload.content.clone().unwrap_or_default();
    let sentiment = payload.sentiment_score;
    match conversations.record_reply(conversation_id, content, sentiment, Utc::now()) {
        Ok(status) => Ok(Some(status.state.to_string())),
        Err(e) => {
            tracing::warn!(
                %conversation_id,
                prospect_id = log.prospect_id,
                error = %e,
                "Reply did not advance conversation",
            );
            Ok(None)
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound subscriptions
// ---------------------------------------------------------------------------

/// GET /api/v1/webhooks/subscriptions
pub async fn list_subscriptions(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let subscriptions = WebhookRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: subscriptions }))
}

/// POST /api/v1/webhooks/subscriptions
///
/// The signing secret is returned in this response only. An empty
/// `event_types` list subscribes to every event.
pub async fn create_subscription(
    State(state): State<AppState>,
    Json(input): Json<CreateWebhookSubscription>,
) -> AppResult<impl IntoResponse> {
    let url = input.url.trim();
    validate_webhook_url(url)?;
    if let Some(unknown) = input.event_types.iter().find(|t| !event_types::is_known(t)) {
        return Err(AppError::Core(CoreError::validation(format!(
            "Unknown event type '{unknown}'"
        ))));
    }

    let secret = generate_webhook_secret();
    let subscription = WebhookRepo::create(&state.pool, url, &input.event_types, &secret).await?;

    tracing::info!(
        subscription_id = subscription.id,
        url = %subscription.url,
        "Webhook subscription created"
    );
    Ok((StatusCode::CREATED, Json(CreatedWebhookSubscription { subscription, secret })))
}

/// DELETE /api/v1/webhooks/subscriptions/{id}
pub async fn delete_subscription(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !WebhookRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "WebhookSubscription", id }));
    }
    Ok(StatusCode::NO_CONTENT)
}
