//! Team alerts through a Slack incoming webhook.

use std::sync::Arc;

use outreach_core::platform::Platform;
use outreach_core::responses::ReplyOutcome;
use outreach_core::types::DbId;
use serde_json::json;

use crate::error::ChannelError;
use crate::rate_limiter::RateLimiter;
use crate::retry::RetryingClient;

pub struct SlackNotifier {
    webhook_url: String,
    http: RetryingClient,
}

impl SlackNotifier {
    pub fn new(
        webhook_url: impl Into<String>,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, ChannelError> {
        Ok(Self {
            webhook_url: webhook_url.into(),
            http: RetryingClient::new(limiter, Platform::Generic)?,
        })
    }

    pub async fn notify(&self, text: &str) -> Result<(), ChannelError> {
        let body = json!({ "text": text });
        self.http
            .send(|client| client.post(&self.webhook_url).json(&body))
            .await?;
        Ok(())
    }

    /// Alert the team that a prospect replied.
    pub async fn notify_reply(&self, alert: &ReplyAlert<'_>) -> Result<(), ChannelError> {
        self.notify(&alert.text()).await
    }
}

pub struct ReplyAlert<'a> {
    pub prospect_id: DbId,
    pub prospect_email: &'a str,
    pub campaign_id: Option<DbId>,
    pub outcome: ReplyOutcome,
    pub sentiment: Option<f64>,
}

impl ReplyAlert<'_> {
    pub fn text(&self) -> String {
        let mut text = format!(
            "New {} reply from {} (prospect {})",
            self.outcome.as_str(),
            self.prospect_email,
            self.prospect_id
        );
        if let Some(campaign) = self.campaign_id {
            text.push_str(&format!(" in campaign {campaign}"));
        }
        if let Some(sentiment) = self.sentiment {
            text.push_str(&format!(", sentiment {sentiment:.2}"));
        }
        text
    }
}
