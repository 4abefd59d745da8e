//! Shared query parameter types for API handlers.

use outreach_core::types::DbId;
use serde::Deserialize;

/// Generic pagination parameters (`?limit=&offset=`).
///
/// Values are clamped with `outreach_db::clamp_limit` / `clamp_offset`.
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Query parameters for list endpoints that support an `include_inactive` flag.
#[derive(Debug, Deserialize)]
pub struct IncludeInactiveParams {
    #[serde(default)]
    pub include_inactive: bool,
}

/// `GET /messages` filters.
#[derive(Debug, Deserialize)]
pub struct MessageListParams {
    pub prospect_id: Option<DbId>,
    pub campaign_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /analytics/responses` filters.
#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    pub campaign_id: Option<DbId>,
    /// Look-back window in days (default 30).
    pub days: Option<i64>,
}
