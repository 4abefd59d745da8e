//! Response and campaign analytics.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use outreach_core::analytics::{build_response_analytics, rate_percent};
use outreach_core::error::CoreError;
use outreach_core::types::{DbId, Timestamp};
use outreach_db::models::campaign::CampaignCounters;
use outreach_db::models::status::CampaignStatus;
use outreach_db::repositories::{CampaignRepo, MessageLogRepo};
use serde::Serialize;

use crate::error::AppResult;
use crate::handlers::campaigns::find_campaign;
use crate::query::AnalyticsParams;
use crate::state::AppState;

/// Default look-back window for response analytics.
const DEFAULT_DAYS: i64 = 30;

/// Longest accepted look-back window.
const MAX_DAYS: i64 = 365;

#[derive(Debug, Serialize)]
pub struct CampaignAnalytics {
    pub campaign_id: DbId,
    pub name: String,
    pub status: &'static str,
    pub started_at: Option<Timestamp>,
    #[serde(flatten)]
    pub counters: CampaignCounters,
    pub delivery_rate: f64,
    pub open_rate: f64,
    pub click_rate: f64,
    pub reply_rate: f64,
}

/// GET /api/v1/analytics/responses?campaign_id=&days=
///
/// Rates are percentages of the messages sent in the window.
pub async fn response_analytics(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> AppResult<impl IntoResponse> {
    let days = params.days.unwrap_or(DEFAULT_DAYS);
    if !(1..=MAX_DAYS).contains(&days) {
        return Err(CoreError::validation(format!("days must be between 1 and {MAX_DAYS}")).into());
    }
    let since = Utc::now() - Duration::days(days);

    let counts = MessageLogRepo::response_counts(&state.pool, params.campaign_id, since).await?;
    let hours = MessageLogRepo::response_hours(&state.pool, params.campaign_id, since).await?;

    Ok(Json(build_response_analytics(&counts, &hours)))
}

/// GET /api/v1/analytics/campaigns/{id}
pub async fn campaign_analytics(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let campaign = find_campaign(&state, id).await?;
    let counters = CampaignRepo::counters(&state.pool, id).await?;

    let delivered = counters.sent;
    Ok(Json(CampaignAnalytics {
        campaign_id: campaign.id,
        name: campaign.name,
        status: CampaignStatus::from_id(campaign.status_id).map_or("unknown", CampaignStatus::name),
        started_at: campaign.started_at,
        delivery_rate: rate_percent(delivered, counters.total_messages),
        open_rate: rate_percent(counters.opened, delivered),
        click_rate: rate_percent(counters.clicked, delivered),
        reply_rate: rate_percent(counters.replied, delivered),
        counters,
    }))
}
