//! Campaign sequence steps.

use outreach_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `campaign_sequences` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SequenceStep {
    pub id: DbId,
    pub campaign_id: DbId,
    pub step_number: i32,
    pub template_id: DbId,
    pub delay_days: i32,
    pub condition: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SequenceStep {
    /// Whether this step only runs for prospects that have not replied.
    pub fn requires_no_response(&self) -> bool {
        self.condition
            .get("no_response")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSequenceStep {
    pub step_number: i32,
    pub template_id: DbId,
    #[serde(default)]
    pub delay_days: i32,
    pub condition: Option<serde_json::Value>,
}
