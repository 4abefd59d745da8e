use axum::routing::{get, post};
use axum::Router;

use crate::handlers::discovery;
use crate::state::AppState;

/// Discovery task routes mounted at `/discovery`.
///
/// ```text
/// POST   /tasks       -> submit_task
/// GET    /tasks/{id}  -> get_task
/// DELETE /tasks/{id}  -> cancel_task
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", post(discovery::submit_task))
        .route("/tasks/{id}", get(discovery::get_task).delete(discovery::cancel_task))
}
