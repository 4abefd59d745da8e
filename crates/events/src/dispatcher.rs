//! Fan-out of platform events to outbound webhook subscriptions.

use std::sync::Arc;

use outreach_db::repositories::WebhookRepo;
use outreach_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::PlatformEvent;
use crate::delivery::webhook::WebhookDelivery;

/// Background service posting every event to the active subscriptions
/// that want it.
///
/// Each delivery runs in its own task so a slow endpoint (with retries)
/// does not hold up the bus.
pub struct WebhookDispatcher {
    pool: DbPool,
    delivery: Arc<WebhookDelivery>,
}

impl WebhookDispatcher {
    pub fn new(pool: DbPool, delivery: WebhookDelivery) -> Self {
        Self { pool, delivery: Arc::new(delivery) }
    }

    /// Run until the bus closes.
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.dispatch(event).await {
                        tracing::error!(error = %e, "Failed to load webhook subscriptions");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Webhook dispatcher lagged, events were skipped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, webhook dispatcher shutting down");
                    break;
                }
            }
        }
    }

    /// Spawn one delivery per matching subscription. Returns how many were
    /// started.
    pub async fn dispatch(&self, event: PlatformEvent) -> Result<usize, sqlx::Error> {
        let subscriptions = WebhookRepo::list_for_event(&self.pool, &event.event_type).await?;
        let count = subscriptions.len();
        let event = Arc::new(event);

        for sub in subscriptions {
            let delivery = Arc::clone(&self.delivery);
            let event = Arc::clone(&event);
            tokio::spawn(async move {
                match delivery.deliver(&sub.url, Some(&sub.secret), &event).await {
                    Ok(()) => tracing::debug!(
                        subscription_id = sub.id,
                        event_type = %event.event_type,
                        "Webhook delivered"
                    ),
                    Err(e) => tracing::warn!(
                        subscription_id = sub.id,
                        url = %sub.url,
                        error = %e,
                        "Webhook delivery abandoned"
                    ),
                }
            });
        }
        Ok(count)
    }
}
