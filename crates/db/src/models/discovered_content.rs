//! Content records produced by discovery tasks.

use outreach_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `discovered_content` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DiscoveredContent {
    pub id: DbId,
    pub job_id: Option<DbId>,
    pub name: String,
    pub content_type: String,
    pub platform: String,
    pub url: String,
    pub data: serde_json::Value,
    pub score: Option<i16>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct NewDiscoveredContent {
    pub job_id: Option<DbId>,
    pub name: String,
    pub content_type: String,
    pub platform: String,
    pub url: String,
    pub data: serde_json::Value,
    pub score: Option<i16>,
}
