//! Outbound webhook subscription models.

use outreach_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `webhook_subscriptions` table.
///
/// The secret is never serialized; it is returned once on creation via
/// [`CreatedWebhookSubscription`].
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WebhookSubscription {
    pub id: DbId,
    pub url: String,
    pub event_types: Vec<String>,
    #[serde(skip_serializing)]
    pub secret: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WebhookSubscription {
    /// An empty `event_types` list subscribes to everything.
    pub fn wants(&self, event_type: &str) -> bool {
        self.is_active
            && (self.event_types.is_empty() || self.event_types.iter().any(|t| t == event_type))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWebhookSubscription {
    pub url: String,
    #[serde(default)]
    pub event_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedWebhookSubscription {
    #[serde(flatten)]
    pub subscription: WebhookSubscription,
    pub secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(event_types: &[&str], is_active: bool) -> WebhookSubscription {
        WebhookSubscription {
            id: 1,
            url: "https://example.com/hook".into(),
            event_types: event_types.iter().map(|s| s.to_string()).collect(),
            secret: "s".into(),
            is_active,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn empty_event_types_match_everything() {
        assert!(sub(&[], true).wants("message.replied"));
    }

    #[test]
    fn filters_by_event_type() {
        let s = sub(&["message.replied"], true);
        assert!(s.wants("message.replied"));
        assert!(!s.wants("message.opened"));
    }

    #[test]
    fn inactive_subscriptions_match_nothing() {
        assert!(!sub(&[], false).wants("prospect.created"));
    }

    #[test]
    fn secret_is_not_serialized() {
        let json = serde_json::to_value(sub(&[], true)).unwrap();
        assert!(json.get("secret").is_none());
    }
}
