//! Slack alerts for prospect replies.

use outreach_channels::{ReplyAlert, SlackNotifier};
use outreach_core::responses::{classify_reply, ReplyOutcome};
use outreach_core::types::DbId;
use outreach_db::repositories::ProspectRepo;
use outreach_db::DbPool;
use outreach_events::{event_types, PlatformEvent};
use serde_json::Value;
use tokio::sync::broadcast;

/// Posts a Slack message for each `message.replied` event.
pub struct ReplyNotifier {
    pool: DbPool,
    slack: SlackNotifier,
}

/// The reply details carried by a `message.replied` event.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplySummary {
    pub prospect_id: DbId,
    pub campaign_id: Option<DbId>,
    pub outcome: ReplyOutcome,
    pub sentiment: Option<f64>,
}

impl ReplySummary {
    /// Extract the summary from a `message.replied` event; `None` for any
    /// other event.
    pub fn from_event(event: &PlatformEvent) -> Option<Self> {
        if event.event_type != event_types::MESSAGE_REPLIED {
            return None;
        }
        let payload = &event.payload;
        let prospect_id = payload.get("prospect_id").and_then(Value::as_i64)?;
        let sentiment = payload.get("sentiment_score").and_then(Value::as_f64);
        let outcome = payload
            .get("outcome")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_else(|| classify_reply(sentiment));
        Some(Self {
            prospect_id,
            campaign_id: payload.get("campaign_id").and_then(Value::as_i64),
            outcome,
            sentiment,
        })
    }
}

impl ReplyNotifier {
    pub fn new(pool: DbPool, slack: SlackNotifier) -> Self {
        Self { pool, slack }
    }

    /// Run until the event bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let Some(reply) = ReplySummary::from_event(&event) else {
                        continue;
                    };
                    if let Err(e) = self.notify(&reply).await {
                        tracing::error!(
                            error = %e,
                            prospect_id = reply.prospect_id,
                            "Failed to send reply alert",
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Reply notifier lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, reply notifier shutting down");
                    break;
                }
            }
        }
    }

    async fn notify(
        &self,
        reply: &ReplySummary,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let email = ProspectRepo::find_by_id(&self.pool, reply.prospect_id)
            .await?
            .map(|p| p.email)
            .unwrap_or_else(|| "unknown".to_string());

        self.slack
            .notify_reply(&ReplyAlert {
                prospect_id: reply.prospect_id,
                prospect_email: &email,
                campaign_id: reply.campaign_id,
                outcome: reply.outcome,
                sentiment: reply.sentiment,
            })
            .await?;
        tracing::debug!(prospect_id = reply.prospect_id, "Reply alert sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reply_events_are_summarized() {
        let event = PlatformEvent::new(event_types::MESSAGE_REPLIED).with_payload(json!({
            "prospect_id": 4,
            "campaign_id": 9,
            "outcome": "positive",
            "sentiment_score": 0.8,
        }));
        let reply = ReplySummary::from_event(&event).unwrap();
        assert_eq!(reply.prospect_id, 4);
        assert_eq!(reply.campaign_id, Some(9));
        assert_eq!(reply.outcome, ReplyOutcome::Positive);
    }

    #[test]
    fn missing_outcome_is_classified_from_sentiment() {
        let event = PlatformEvent::new(event_types::MESSAGE_REPLIED)
            .with_payload(json!({ "prospect_id": 4, "sentiment_score": -0.9 }));
        assert_eq!(ReplySummary::from_event(&event).unwrap().outcome, ReplyOutcome::Negative);
    }

    #[test]
    fn other_events_are_ignored() {
        let event = PlatformEvent::new(event_types::MESSAGE_OPENED)
            .with_payload(json!({ "prospect_id": 4 }));
        assert!(ReplySummary::from_event(&event).is_none());
    }
}
