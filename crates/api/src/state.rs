use std::sync::Arc;

use outreach_core::conversation::ConversationFlowManager;
use tokio::sync::Mutex;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: outreach_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Centralized event bus for publishing platform events.
    pub event_bus: Arc<outreach_events::EventBus>,
    /// Open conversations. Replies arriving through the tracking webhook
    /// and the timeout checker both advance them.
    pub conversations: Arc<Mutex<ConversationFlowManager>>,
}
