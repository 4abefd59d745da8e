pub mod ab_tests;
pub mod analytics;
pub mod campaigns;
pub mod conversations;
pub mod discovery;
pub mod health;
pub mod messages;
pub mod prospects;
pub mod templates;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /prospects                                   create, list
/// /prospects/bulk-update                       bulk status update (POST)
/// /prospects/{id}                              get, update, GDPR delete
/// /prospects/{id}/consent                      set consent (PUT)
/// /prospects/{id}/unsubscribe                  revoke consent (DELETE)
/// /prospects/{id}/score                        queue re-scoring (POST)
///
/// /templates                                   create, list
/// /templates/{id}                              get, update, deactivate
/// /templates/{id}/stats                        usage stats
///
/// /campaigns                                   create, list
/// /campaigns/{id}                              get
/// /campaigns/{id}/start|pause|resume           lifecycle (POST)
/// /campaigns/{id}/sequences                    list, add step
/// /campaigns/{id}/sequences/{step_id}          remove step
/// /campaigns/{id}/ab-tests                     create A/B test
/// /ab-tests/{id}/results                       variant results
///
/// /messages                                    message log
///
/// /webhooks/messages/{id}/{event}              inbound tracking (POST)
/// /webhooks/subscriptions                      list, register
/// /webhooks/subscriptions/{id}                 remove
///
/// /conversations                               start
/// /conversations/{id}                          status
/// /conversations/{id}/state                    transition (PUT)
///
/// /discovery/tasks                             submit
/// /discovery/tasks/{id}                        status, cancel
///
/// /analytics/responses                         response analytics
/// /analytics/campaigns/{id}                    campaign analytics
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/prospects", prospects::router())
        .nest("/templates", templates::router())
        .nest("/campaigns", campaigns::router())
        .nest("/ab-tests", ab_tests::router())
        .nest("/messages", messages::router())
        .nest("/webhooks", webhooks::router())
        .nest("/conversations", conversations::router())
        .nest("/discovery", discovery::router())
        .nest("/analytics", analytics::router())
}
