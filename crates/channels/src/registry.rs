//! Message type → delivery channel lookup.

use std::collections::HashMap;
use std::sync::Arc;

use outreach_core::message::MessageType;

use crate::channel::{DeliveryChannel, DeliveryReceipt, OutboundMessage};
use crate::config::ChannelConfig;
use crate::email::EmailChannel;
use crate::error::ChannelError;
use crate::rate_limiter::RateLimiter;
use crate::social::{LinkedInChannel, RedditChannel, TwitterChannel};

pub struct ChannelRegistry {
    channels: HashMap<MessageType, Arc<dyn DeliveryChannel>>,
    limiter: Arc<RateLimiter>,
}

impl ChannelRegistry {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { channels: HashMap::new(), limiter }
    }

    /// Register every channel whose credentials are present.
    pub fn from_config(
        config: &ChannelConfig,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, ChannelError> {
        let mut registry = Self::new(Arc::clone(&limiter));

        if let Some(email) = EmailChannel::from_config(config, Arc::clone(&limiter))? {
            registry.register(Arc::new(email));
        }
        if let Some(token) = &config.linkedin_access_token {
            registry.register(Arc::new(LinkedInChannel::new(token.clone(), Arc::clone(&limiter))?));
        }
        if let Some(token) = &config.twitter_bearer_token {
            registry.register(Arc::new(TwitterChannel::new(token.clone(), Arc::clone(&limiter))?));
        }
        if let Some(token) = &config.reddit_access_token {
            registry.register(Arc::new(RedditChannel::new(token.clone(), Arc::clone(&limiter))?));
        }

        let configured: Vec<&str> =
            registry.configured_types().iter().map(|t| t.as_str()).collect();
        tracing::info!(channels = ?configured, "Delivery channels configured");
        Ok(registry)
    }

    /// Add or replace the channel for its message type.
    pub fn register(&mut self, channel: Arc<dyn DeliveryChannel>) {
        self.channels.insert(channel.message_type(), channel);
    }

    pub fn is_configured(&self, message_type: MessageType) -> bool {
        self.channels.contains_key(&message_type)
    }

    pub fn configured_types(&self) -> Vec<MessageType> {
        MessageType::ALL
            .into_iter()
            .filter(|t| self.channels.contains_key(t))
            .collect()
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Deliver through the channel for the message's type, holding a rate
    /// permit for the type's platform while sending.
    pub async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, ChannelError> {
        let channel = self
            .channels
            .get(&message.message_type)
            .ok_or(ChannelError::NotConfigured(message.message_type))?;
        let _permit = self.limiter.acquire(message.message_type.platform()).await?;
        channel.send(message).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use outreach_core::platform::Platform;

    use super::*;

    struct CountingChannel {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl DeliveryChannel for CountingChannel {
        fn message_type(&self) -> MessageType {
            MessageType::Linkedin
        }

        async fn send(&self, _message: &OutboundMessage) -> Result<DeliveryReceipt, ChannelError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(DeliveryReceipt::new(MessageType::Linkedin, Some("m-1".to_string())))
        }
    }

    fn message(message_type: MessageType) -> OutboundMessage {
        OutboundMessage {
            message_type,
            recipient: "urn:li:person:1".to_string(),
            subject: None,
            content: "Hello".to_string(),
        }
    }

    #[tokio::test]
    async fn missing_channel_is_not_configured() {
        let registry = ChannelRegistry::new(Arc::new(RateLimiter::new()));
        assert_matches!(
            registry.send(&message(MessageType::Reddit)).await,
            Err(ChannelError::NotConfigured(MessageType::Reddit))
        );
    }

    #[tokio::test]
    async fn sends_through_registered_channel_and_counts_request() {
        let limiter = Arc::new(RateLimiter::new());
        let channel = Arc::new(CountingChannel { sent: AtomicUsize::new(0) });
        let mut registry = ChannelRegistry::new(Arc::clone(&limiter));
        registry.register(channel.clone());

        let receipt = registry.send(&message(MessageType::Linkedin)).await.unwrap();
        assert_eq!(receipt.provider_message_id.as_deref(), Some("m-1"));
        assert_eq!(channel.sent.load(Ordering::SeqCst), 1);
        assert_eq!(limiter.status(Platform::LinkedIn).current_requests.minute, 1);
        assert_eq!(registry.configured_types(), vec![MessageType::Linkedin]);
    }

    #[test]
    fn empty_config_registers_nothing() {
        let registry =
            ChannelRegistry::from_config(&ChannelConfig::default(), Arc::new(RateLimiter::new()))
                .unwrap();
        assert!(registry.configured_types().is_empty());
    }
}
