//! Periodic conversation timeout checks.
//!
//! Conversations waiting for a reply move to the next follow-up state once
//! their wait expires; the last wait closes them as unresponsive. Closed
//! conversations are forgotten once they are older than the retention.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use outreach_core::conversation::ConversationFlowManager;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// How often open conversations are checked.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(300);

/// How long a closed conversation stays queryable.
pub const CLOSED_RETENTION: Duration = Duration::from_secs(24 * 3600);

/// Run the timeout checker until `cancel` is triggered.
///
/// On shutdown every still-open conversation is closed as unresponsive.
pub async fn run(
    conversations: Arc<Mutex<ConversationFlowManager>>,
    interval: Duration,
    retention: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = interval.as_secs(), "Conversation timeout checker started");

    let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::hours(24));
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let closed = conversations.lock().await.cleanup(Utc::now());
                tracing::info!(closed, "Conversation timeout checker stopping");
                break;
            }
            _ = ticker.tick() => {
                let now = Utc::now();
                let (transitions, pruned) = {
                    let mut manager = conversations.lock().await;
                    let transitions = manager.check_timeouts(now);
                    (transitions, manager.prune_closed(now - retention))
                };
                for t in &transitions {
                    tracing::info!(
                        conversation_id = %t.conversation_id,
                        from = %t.from,
                        to = %t.to,
                        "Conversation timed out",
                    );
                }
                if pruned > 0 {
                    tracing::debug!(pruned, "Old closed conversations dropped");
                }
            }
        }
    }
}
