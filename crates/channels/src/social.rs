//! Direct messages on LinkedIn, Twitter and Reddit.
//!
//! All three authenticate with a bearer token and go through a
//! [`RetryingClient`] bound to the platform, so provider 429s feed the
//! platform's backoff.

use std::sync::Arc;

use async_trait::async_trait;
use outreach_core::message::MessageType;
use serde_json::{json, Value};

use crate::channel::{DeliveryChannel, DeliveryReceipt, OutboundMessage};
use crate::error::ChannelError;
use crate::rate_limiter::RateLimiter;
use crate::retry::RetryingClient;

const LINKEDIN_BASE_URL: &str = "https://api.linkedin.com";
const TWITTER_BASE_URL: &str = "https://api.twitter.com";
const REDDIT_BASE_URL: &str = "https://oauth.reddit.com";

/// Reddit rejects private message subjects longer than this.
const REDDIT_MAX_SUBJECT: usize = 100;

/// LinkedIn returns the created entity id in this header.
const LINKEDIN_ID_HEADER: &str = "x-restli-id";

struct BearerApi {
    token: String,
    base_url: String,
    http: RetryingClient,
}

impl BearerApi {
    fn new(
        token: String,
        base_url: &str,
        message_type: MessageType,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, ChannelError> {
        Ok(Self {
            token,
            base_url: base_url.to_string(),
            http: RetryingClient::new(limiter, message_type.platform())?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn require_recipient(message: &OutboundMessage) -> Result<&str, ChannelError> {
    let recipient = message.recipient.trim();
    if recipient.is_empty() {
        return Err(ChannelError::InvalidRecipient(format!(
            "{} message has no recipient",
            message.message_type
        )));
    }
    Ok(recipient)
}

// ---------------------------------------------------------------------------
// LinkedIn
// ---------------------------------------------------------------------------

pub struct LinkedInChannel {
    api: BearerApi,
}

impl LinkedInChannel {
    pub fn new(token: impl Into<String>, limiter: Arc<RateLimiter>) -> Result<Self, ChannelError> {
        Ok(Self {
            api: BearerApi::new(token.into(), LINKEDIN_BASE_URL, MessageType::Linkedin, limiter)?,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api.base_url = url.into();
        self
    }
}

#[async_trait]
impl DeliveryChannel for LinkedInChannel {
    fn message_type(&self) -> MessageType {
        MessageType::Linkedin
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, ChannelError> {
        let recipient = require_recipient(message)?;
        let url = self.api.url("/v2/messages");
        let body = json!({
            "recipients": [recipient],
            "subject": message.subject.clone().unwrap_or_default(),
            "body": message.content,
        });
        let response = self
            .api
            .http
            .send(|client| client.post(&url).bearer_auth(&self.api.token).json(&body))
            .await?;
        let id = response
            .headers()
            .get(LINKEDIN_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        tracing::info!(recipient, "LinkedIn message sent");
        Ok(DeliveryReceipt::new(MessageType::Linkedin, id))
    }
}

// ---------------------------------------------------------------------------
// Twitter
// ---------------------------------------------------------------------------

pub struct TwitterChannel {
    api: BearerApi,
}

impl TwitterChannel {
    pub fn new(token: impl Into<String>, limiter: Arc<RateLimiter>) -> Result<Self, ChannelError> {
        Ok(Self {
            api: BearerApi::new(token.into(), TWITTER_BASE_URL, MessageType::Twitter, limiter)?,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api.base_url = url.into();
        self
    }
}

#[async_trait]
impl DeliveryChannel for TwitterChannel {
    fn message_type(&self) -> MessageType {
        MessageType::Twitter
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, ChannelError> {
        let recipient = require_recipient(message)?;
        let url = self
            .api
            .url(&format!("/2/dm_conversations/with/{recipient}/messages"));
        let body = json!({ "text": message.content });
        let response = self
            .api
            .http
            .send(|client| client.post(&url).bearer_auth(&self.api.token).json(&body))
            .await?;
        let payload: Value = response.json().await?;
        let id = twitter_event_id(&payload)?;
        tracing::info!(recipient, "Twitter direct message sent");
        Ok(DeliveryReceipt::new(MessageType::Twitter, Some(id)))
    }
}

fn twitter_event_id(payload: &Value) -> Result<String, ChannelError> {
    payload
        .pointer("/data/dm_event_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ChannelError::Decode("missing data.dm_event_id".to_string()))
}

// ---------------------------------------------------------------------------
// Reddit
// ---------------------------------------------------------------------------

pub struct RedditChannel {
    api: BearerApi,
}

impl RedditChannel {
    pub fn new(token: impl Into<String>, limiter: Arc<RateLimiter>) -> Result<Self, ChannelError> {
        Ok(Self {
            api: BearerApi::new(token.into(), REDDIT_BASE_URL, MessageType::Reddit, limiter)?,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api.base_url = url.into();
        self
    }
}

#[async_trait]
impl DeliveryChannel for RedditChannel {
    fn message_type(&self) -> MessageType {
        MessageType::Reddit
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, ChannelError> {
        let recipient = require_recipient(message)?.trim_start_matches("u/").to_string();
        let subject = reddit_subject(message.subject.as_deref());
        let url = self.api.url("/api/compose");
        let form = [
            ("api_type", "json"),
            ("to", recipient.as_str()),
            ("subject", subject.as_str()),
            ("text", message.content.as_str()),
        ];
        let response = self
            .api
            .http
            .send(|client| client.post(&url).bearer_auth(&self.api.token).form(&form))
            .await?;
        let payload: Value = response.json().await?;
        reddit_errors(&payload)?;
        tracing::info!(recipient = %recipient, "Reddit private message sent");
        Ok(DeliveryReceipt::new(MessageType::Reddit, None))
    }
}

fn reddit_subject(subject: Option<&str>) -> String {
    let subject = subject.map(str::trim).filter(|s| !s.is_empty()).unwrap_or("Hello");
    subject.chars().take(REDDIT_MAX_SUBJECT).collect()
}

/// Reddit reports failures inside a 200 body as `json.errors`.
fn reddit_errors(payload: &Value) -> Result<(), ChannelError> {
    let errors = payload
        .pointer("/json/errors")
        .and_then(Value::as_array)
        .filter(|e| !e.is_empty());
    match errors {
        None => Ok(()),
        Some(errors) => {
            let text = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            if text.contains("USER_DOESNT_EXIST") {
                Err(ChannelError::InvalidRecipient(text))
            } else {
                Err(ChannelError::Decode(text))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn twitter_event_id_is_required() {
        let ok = json!({"data": {"dm_event_id": "123", "dm_conversation_id": "9"}});
        assert_eq!(twitter_event_id(&ok).unwrap(), "123");
        assert_matches!(twitter_event_id(&json!({})), Err(ChannelError::Decode(_)));
    }

    #[test]
    fn reddit_subject_defaults_and_truncates() {
        assert_eq!(reddit_subject(None), "Hello");
        assert_eq!(reddit_subject(Some("  ")), "Hello");
        assert_eq!(reddit_subject(Some(&"x".repeat(150))).len(), 100);
    }

    #[test]
    fn reddit_body_errors_are_surfaced() {
        assert!(reddit_errors(&json!({"json": {"errors": []}})).is_ok());
        let missing = json!({
            "json": {"errors": [["USER_DOESNT_EXIST", "that user doesn't exist", "to"]]}
        });
        assert_matches!(reddit_errors(&missing), Err(ChannelError::InvalidRecipient(_)));
    }

    #[tokio::test]
    async fn empty_recipient_is_rejected() {
        let channel = TwitterChannel::new("t", Arc::new(RateLimiter::new())).unwrap();
        let message = OutboundMessage {
            message_type: MessageType::Twitter,
            recipient: " ".to_string(),
            subject: None,
            content: "hi".to_string(),
        };
        assert_matches!(channel.send(&message).await, Err(ChannelError::InvalidRecipient(_)));
    }
}
