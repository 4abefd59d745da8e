//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>`; every subscriber sees every
//! [`PlatformEvent`] published after it subscribed.

use chrono::{DateTime, Utc};
use outreach_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Dot-separated event names.
pub mod event_types {
    pub const PROSPECT_CREATED: &str = "prospect.created";
    pub const PROSPECT_UPDATED: &str = "prospect.updated";
    pub const PROSPECT_STATUS_CHANGED: &str = "prospect.status_changed";
    pub const PROSPECT_DELETED: &str = "prospect.deleted";
    pub const CAMPAIGN_STARTED: &str = "campaign.started";
    pub const CAMPAIGN_PAUSED: &str = "campaign.paused";
    pub const MESSAGE_SENT: &str = "message.sent";
    pub const MESSAGE_OPENED: &str = "message.opened";
    pub const MESSAGE_CLICKED: &str = "message.clicked";
    pub const MESSAGE_REPLIED: &str = "message.replied";

    pub const ALL: [&str; 10] = [
        PROSPECT_CREATED,
        PROSPECT_UPDATED,
        PROSPECT_STATUS_CHANGED,
        PROSPECT_DELETED,
        CAMPAIGN_STARTED,
        CAMPAIGN_PAUSED,
        MESSAGE_SENT,
        MESSAGE_OPENED,
        MESSAGE_CLICKED,
        MESSAGE_REPLIED,
    ];

    pub fn is_known(name: &str) -> bool {
        ALL.contains(&name)
    }
}

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// A domain event that occurred on the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated event name, e.g. `"message.replied"`.
    pub event_type: String,
    pub source_entity_type: Option<String>,
    pub source_entity_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// The JSON body posted to webhook subscribers.
    pub fn webhook_body(&self) -> serde_json::Value {
        serde_json::json!({
            "event_type": self.event_type,
            "payload": self.payload,
            "timestamp": self.timestamp,
            "source_entity_type": self.source_entity_type,
            "source_entity_id": self.source_entity_id,
        })
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest messages are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Without subscribers
    /// the event is dropped.
    pub fn publish(&self, event: PlatformEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
