//! Message template models and DTOs.

use outreach_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `message_templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MessageTemplate {
    pub id: DbId,
    pub name: String,
    pub message_type: String,
    pub subject: Option<String>,
    pub content: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplate {
    pub name: String,
    pub message_type: String,
    pub subject: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTemplate {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub is_active: Option<bool>,
}

/// Usage statistics for a template.
///
/// `success_rate` is the share of sent messages that were opened, clicked
/// or replied to, in percent.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateStats {
    pub template_id: DbId,
    pub total_uses: i64,
    pub successful: i64,
    pub success_rate: f64,
}
