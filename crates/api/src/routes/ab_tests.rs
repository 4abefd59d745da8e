use axum::routing::get;
use axum::Router;

use crate::handlers::ab_tests;
use crate::state::AppState;

/// A/B test routes mounted at `/ab-tests`. Tests are created under their
/// campaign (`POST /campaigns/{id}/ab-tests`).
///
/// ```text
/// GET    /{id}/results  -> ab_test_results
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/results", get(ab_tests::ab_test_results))
}
