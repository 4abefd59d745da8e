use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::prospects;
use crate::state::AppState;

/// Prospect routes mounted at `/prospects`.
///
/// ```text
/// GET    /                  -> list_prospects
/// POST   /                  -> create_prospect
/// POST   /bulk-update       -> bulk_update_status
/// GET    /{id}              -> get_prospect
/// PUT    /{id}              -> update_prospect
/// DELETE /{id}              -> delete_prospect
/// PUT    /{id}/consent      -> set_consent
/// DELETE /{id}/unsubscribe  -> unsubscribe
/// POST   /{id}/score        -> rescore_prospect
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(prospects::list_prospects).post(prospects::create_prospect))
        .route("/bulk-update", post(prospects::bulk_update_status))
        .route(
            "/{id}",
            get(prospects::get_prospect)
                .put(prospects::update_prospect)
                .delete(prospects::delete_prospect),
        )
        .route("/{id}/consent", put(prospects::set_consent))
        .route("/{id}/unsubscribe", delete(prospects::unsubscribe))
        .route("/{id}/score", post(prospects::rescore_prospect))
}
