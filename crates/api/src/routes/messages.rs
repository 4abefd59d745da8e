use axum::routing::get;
use axum::Router;

use crate::handlers::messages;
use crate::state::AppState;

/// Message log routes mounted at `/messages`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(messages::list_messages))
}
