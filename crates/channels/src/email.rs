//! Email delivery through SendGrid's v3 API or plain SMTP.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use outreach_core::message::MessageType;
use outreach_core::platform::Platform;
use serde_json::{json, Value};

use crate::channel::{DeliveryChannel, DeliveryReceipt, OutboundMessage};
use crate::config::{ChannelConfig, SmtpConfig};
use crate::error::ChannelError;
use crate::rate_limiter::RateLimiter;
use crate::retry::RetryingClient;

const SENDGRID_BASE_URL: &str = "https://api.sendgrid.com";

/// SendGrid puts the message id in this response header.
const SENDGRID_MESSAGE_ID_HEADER: &str = "x-message-id";

enum Backend {
    SendGrid {
        api_key: String,
        base_url: String,
        http: RetryingClient,
    },
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
}

pub struct EmailChannel {
    from: String,
    backend: Backend,
}

impl EmailChannel {
    pub fn sendgrid(
        api_key: impl Into<String>,
        from: impl Into<String>,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, ChannelError> {
        Ok(Self {
            from: from.into(),
            backend: Backend::SendGrid {
                api_key: api_key.into(),
                base_url: SENDGRID_BASE_URL.to_string(),
                http: RetryingClient::new(limiter, Platform::Generic)?,
            },
        })
    }

    pub fn smtp(config: &SmtpConfig, from: impl Into<String>) -> Result<Self, ChannelError> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?.port(config.port);
        if let (Some(user), Some(pass)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(Self { from: from.into(), backend: Backend::Smtp(builder.build()) })
    }

    /// SendGrid when an API key is configured, else SMTP, else nothing.
    pub fn from_config(
        config: &ChannelConfig,
        limiter: Arc<RateLimiter>,
    ) -> Result<Option<Self>, ChannelError> {
        if let Some(key) = &config.sendgrid_api_key {
            return Self::sendgrid(key.clone(), config.email_from.clone(), limiter).map(Some);
        }
        match &config.smtp {
            Some(smtp) => Self::smtp(smtp, config.email_from.clone()).map(Some),
            None => Ok(None),
        }
    }

    /// Point the SendGrid backend at another host. No effect on SMTP.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        if let Backend::SendGrid { base_url, .. } = &mut self.backend {
            *base_url = url.into();
        }
        self
    }

    async fn send_sendgrid(
        &self,
        api_key: &str,
        base_url: &str,
        http: &RetryingClient,
        message: &OutboundMessage,
    ) -> Result<DeliveryReceipt, ChannelError> {
        let url = format!("{}/v3/mail/send", base_url.trim_end_matches('/'));
        let body = sendgrid_body(&self.from, message);
        let response = http
            .send(|client| client.post(&url).bearer_auth(api_key).json(&body))
            .await?;
        let message_id = response
            .headers()
            .get(SENDGRID_MESSAGE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(DeliveryReceipt::new(MessageType::Email, message_id))
    }

    async fn send_smtp(
        &self,
        mailer: &AsyncSmtpTransport<Tokio1Executor>,
        message: &OutboundMessage,
    ) -> Result<DeliveryReceipt, ChannelError> {
        let email = Message::builder()
            .from(self.from.parse()?)
            .to(message.recipient.parse()?)
            .subject(message.subject.clone().unwrap_or_default())
            .header(ContentType::TEXT_PLAIN)
            .body(message.content.clone())
            .map_err(|e| ChannelError::Build(e.to_string()))?;
        mailer.send(email).await?;
        Ok(DeliveryReceipt::new(MessageType::Email, None))
    }
}

#[async_trait]
impl DeliveryChannel for EmailChannel {
    fn message_type(&self) -> MessageType {
        MessageType::Email
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, ChannelError> {
        let receipt = match &self.backend {
            Backend::SendGrid { api_key, base_url, http } => {
                self.send_sendgrid(api_key, base_url, http, message).await?
            }
            Backend::Smtp(mailer) => self.send_smtp(mailer, message).await?,
        };
        tracing::info!(to = %message.recipient, "Email sent");
        Ok(receipt)
    }
}

/// Request body for `POST /v3/mail/send`.
pub fn sendgrid_body(from: &str, message: &OutboundMessage) -> Value {
    json!({
        "personalizations": [{"to": [{"email": message.recipient}]}],
        "from": {"email": from},
        "subject": message.subject.clone().unwrap_or_default(),
        "content": [{"type": "text/plain", "value": message.content}],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> OutboundMessage {
        OutboundMessage {
            message_type: MessageType::Email,
            recipient: "jane@example.com".to_string(),
            subject: Some("Hello".to_string()),
            content: "Hi Jane".to_string(),
        }
    }

    #[test]
    fn sendgrid_body_shape() {
        let body = sendgrid_body("team@example.com", &message());
        assert_eq!(body["personalizations"][0]["to"][0]["email"], "jane@example.com");
        assert_eq!(body["from"]["email"], "team@example.com");
        assert_eq!(body["subject"], "Hello");
        assert_eq!(body["content"][0]["value"], "Hi Jane");
    }

    #[test]
    fn not_configured_without_credentials() {
        let config = ChannelConfig::default();
        let channel = EmailChannel::from_config(&config, Arc::new(RateLimiter::new())).unwrap();
        assert!(channel.is_none());
    }

    #[tokio::test]
    async fn smtp_rejects_bad_recipient_before_connecting() {
        let smtp = SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            user: None,
            password: None,
        };
        let channel = EmailChannel::smtp(&smtp, "team@example.com").unwrap();
        let mut msg = message();
        msg.recipient = "not-an-email".to_string();
        let err = channel.send(&msg).await.unwrap_err();
        assert!(matches!(err, ChannelError::Address(_)));
        assert!(err.is_permanent());
    }
}
