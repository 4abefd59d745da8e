use axum::routing::get;
use axum::Router;

use crate::handlers::analytics;
use crate::state::AppState;

/// Analytics routes mounted at `/analytics`.
///
/// ```text
/// GET /responses       -> response_analytics
/// GET /campaigns/{id}  -> campaign_analytics
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/responses", get(analytics::response_analytics))
        .route("/campaigns/{id}", get(analytics::campaign_analytics))
}
