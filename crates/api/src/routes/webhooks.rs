use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::webhooks;
use crate::state::AppState;

/// Webhook routes mounted at `/webhooks`.
///
/// ```text
/// POST   /messages/{id}/{event}  -> track_message_event (inbound)
/// GET    /subscriptions          -> list_subscriptions
/// POST   /subscriptions          -> create_subscription
/// DELETE /subscriptions/{id}     -> delete_subscription
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages/{id}/{event}", post(webhooks::track_message_event))
        .route(
            "/subscriptions",
            get(webhooks::list_subscriptions).post(webhooks::create_subscription),
        )
        .route("/subscriptions/{id}", delete(webhooks::delete_subscription))
}
