use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{ab_tests, campaigns};
use crate::state::AppState;

/// Campaign routes mounted at `/campaigns`.
///
/// ```text
/// GET    /                          -> list_campaigns
/// POST   /                          -> create_campaign
/// GET    /{id}                      -> get_campaign
/// POST   /{id}/start                -> start_campaign
/// POST   /{id}/pause                -> pause_campaign
/// POST   /{id}/resume               -> resume_campaign
/// GET    /{id}/sequences            -> list_sequence_steps
/// POST   /{id}/sequences            -> add_sequence_step
/// DELETE /{id}/sequences/{step_id}  -> remove_sequence_step
/// POST   /{id}/ab-tests             -> create_ab_test
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(campaigns::list_campaigns).post(campaigns::create_campaign))
        .route("/{id}", get(campaigns::get_campaign))
        .route("/{id}/start", post(campaigns::start_campaign))
        .route("/{id}/pause", post(campaigns::pause_campaign))
        .route("/{id}/resume", post(campaigns::resume_campaign))
        .route(
            "/{id}/sequences",
            get(campaigns::list_sequence_steps).post(campaigns::add_sequence_step),
        )
        .route("/{id}/sequences/{step_id}", delete(campaigns::remove_sequence_step))
        .route("/{id}/ab-tests", post(ab_tests::create_ab_test))
}
