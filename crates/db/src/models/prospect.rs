//! Affiliate prospect models and DTOs.

use std::collections::HashMap;

use outreach_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `affiliate_prospects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Prospect {
    pub id: DbId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub website: Option<String>,
    pub lead_source: Option<String>,
    pub consent_given: bool,
    pub consent_timestamp: Option<Timestamp>,
    pub qualification_score: i16,
    pub status_id: i16,
    pub social_profiles: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Prospect {
    /// Fields available to `{{ placeholder }}` substitution.
    pub fn template_context(&self) -> HashMap<String, String> {
        let mut ctx = HashMap::new();
        ctx.insert("email".to_string(), self.email.clone());
        let optional = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("company", &self.company),
            ("website", &self.website),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                ctx.insert(key.to_string(), v.clone());
            }
        }
        ctx
    }
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Payload for creating a prospect.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProspect {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub website: Option<String>,
    pub lead_source: Option<String>,
    #[serde(default)]
    pub consent_given: bool,
    pub social_profiles: Option<serde_json::Value>,
}

/// Partial update of a prospect. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProspect {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub website: Option<String>,
    pub lead_source: Option<String>,
    pub status: Option<String>,
    pub social_profiles: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsentUpdate {
    pub consent_given: bool,
}

/// Set the same status on many prospects at once.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkUpdateProspects {
    pub prospect_ids: Vec<DbId>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkUpdateResult {
    pub updated: u64,
}

/// Query parameters for listing prospects (`?status=&limit=&offset=`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProspectListParams {
    pub status: Option<String>,
    pub min_score: Option<i16>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
