//! Outreach message log models.

use outreach_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `message_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MessageLog {
    pub id: DbId,
    pub prospect_id: DbId,
    pub campaign_id: Option<DbId>,
    pub template_id: Option<DbId>,
    pub message_type: String,
    pub subject: Option<String>,
    pub content: String,
    pub step_number: Option<i32>,
    pub status_id: i16,
    pub sent_at: Option<Timestamp>,
    pub opened_at: Option<Timestamp>,
    pub clicked_at: Option<Timestamp>,
    pub replied_at: Option<Timestamp>,
    pub ab_test_variant: Option<String>,
    pub sentiment_score: Option<f64>,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A message log after a tracking update, with whether that update was
/// the first of its kind on the message.
#[derive(Debug, Clone, FromRow)]
pub struct TrackedMessage {
    #[sqlx(flatten)]
    pub log: MessageLog,
    pub first_event: bool,
}

/// Insert payload used by the sequence processor.
#[derive(Debug, Clone)]
pub struct NewMessageLog {
    pub prospect_id: DbId,
    pub campaign_id: Option<DbId>,
    pub template_id: Option<DbId>,
    pub message_type: String,
    pub subject: Option<String>,
    pub content: String,
    pub step_number: Option<i32>,
    pub status_id: i16,
    pub ab_test_variant: Option<String>,
    pub metadata: serde_json::Value,
}

/// Query parameters for `GET /messages`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageListParams {
    pub prospect_id: Option<DbId>,
    pub campaign_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Body of an inbound reply webhook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyPayload {
    pub content: Option<String>,
    pub sentiment_score: Option<f64>,
}
