//! Background job queue models.
//!
//! Jobs are the hand-off between the API and the worker. `job_type` is
//! one of the constants below; `payload` is the matching payload struct
//! serialized to JSON.

use outreach_core::platform::Platform;
use outreach_core::task::{TaskKind, TaskPriority};
use outreach_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const JOB_SCORE_PROSPECT: &str = "score_prospect";
pub const JOB_SEQUENCE_STEP: &str = "sequence_step";
pub const JOB_DISCOVERY: &str = "discovery";

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub status_id: i16,
    pub priority: i16,
    pub scheduled_at: Timestamp,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub result: Option<serde_json::Value>,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert payload for a new job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_type: &'static str,
    pub payload: serde_json::Value,
    pub priority: i16,
    pub scheduled_at: Option<Timestamp>,
}

impl NewJob {
    pub fn new(job_type: &'static str, payload: impl Serialize) -> Result<Self, serde_json::Error> {
        Ok(Self {
            job_type,
            payload: serde_json::to_value(payload)?,
            priority: TaskPriority::Medium.as_i16(),
            scheduled_at: None,
        })
    }

    pub fn with_priority(mut self, priority: i16) -> Self {
        self.priority = priority;
        self
    }

    pub fn scheduled_at(mut self, at: Timestamp) -> Self {
        self.scheduled_at = Some(at);
        self
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreProspectPayload {
    pub prospect_id: DbId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStepPayload {
    pub campaign_id: DbId,
    pub prospect_id: DbId,
}

/// A discovery task submitted through the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryTaskPayload {
    pub kind: TaskKind,
    pub platform: Platform,
    #[serde(default)]
    pub priority: TaskPriority,
    /// Ids of discovery jobs that must complete first.
    #[serde(default)]
    pub dependencies: Vec<DbId>,
    #[serde(default)]
    pub target: serde_json::Value,
    /// Explicit schedule; otherwise the scheduler picks an optimal time.
    pub scheduled_at: Option<Timestamp>,
}
