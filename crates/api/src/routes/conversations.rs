use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::conversations;
use crate::state::AppState;

/// Conversation routes mounted at `/conversations`.
///
/// ```text
/// POST   /            -> start_conversation
/// GET    /{id}        -> conversation_status
/// PUT    /{id}/state  -> update_conversation_state
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(conversations::start_conversation))
        .route("/{id}", get(conversations::conversation_status))
        .route("/{id}/state", put(conversations::update_conversation_state))
}
