//! Outreach campaign models and DTOs.

use outreach_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `outreach_campaigns` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Campaign {
    pub id: DbId,
    pub name: String,
    pub template_id: DbId,
    pub target_criteria: serde_json::Value,
    pub status_id: i16,
    pub started_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Campaign {
    /// Parsed targeting criteria; malformed JSON targets everyone.
    pub fn criteria(&self) -> TargetCriteria {
        serde_json::from_value(self.target_criteria.clone()).unwrap_or_default()
    }
}

/// Which prospects a campaign reaches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetCriteria {
    #[serde(default)]
    pub min_score: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampaign {
    pub name: String,
    pub template_id: DbId,
    #[serde(default)]
    pub target_criteria: TargetCriteria,
}

/// Delivery and engagement counters for one campaign.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct CampaignCounters {
    pub total_messages: i64,
    pub sent: i64,
    pub bounced: i64,
    pub opened: i64,
    pub clicked: i64,
    pub replied: i64,
}

/// Result of starting a campaign.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignStartResult {
    pub campaign: Campaign,
    pub prospects_targeted: usize,
}
