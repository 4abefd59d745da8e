//! The delivery channel abstraction.

use async_trait::async_trait;
use chrono::Utc;
use outreach_core::message::MessageType;
use outreach_core::types::Timestamp;
use serde::Serialize;

use crate::error::ChannelError;

/// A rendered message ready to hand to a provider.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage {
    pub message_type: MessageType,
    /// Email address, LinkedIn member URN, Twitter user id or Reddit
    /// username depending on `message_type`.
    pub recipient: String,
    pub subject: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReceipt {
    pub message_type: MessageType,
    /// Identifier assigned by the provider, when it returns one.
    pub provider_message_id: Option<String>,
    pub sent_at: Timestamp,
}

impl DeliveryReceipt {
    pub fn new(message_type: MessageType, provider_message_id: Option<String>) -> Self {
        Self { message_type, provider_message_id, sent_at: Utc::now() }
    }
}

#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// The message type this channel delivers.
    fn message_type(&self) -> MessageType;

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, ChannelError>;
}
