//! A/B test models.

use outreach_core::analytics::rate_percent;
use outreach_core::types::{DbId, Timestamp};
use outreach_core::validation::AbVariant;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `ab_tests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AbTest {
    pub id: DbId,
    pub campaign_id: DbId,
    pub name: String,
    pub variants: serde_json::Value,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AbTest {
    pub fn parsed_variants(&self) -> Vec<AbVariant> {
        serde_json::from_value(self.variants.clone()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAbTest {
    pub name: String,
    pub variants: Vec<AbVariant>,
}

/// A row from the `ab_test_results` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AbTestResult {
    pub id: DbId,
    pub ab_test_id: DbId,
    pub variant_id: String,
    pub sent_count: i32,
    pub opened_count: i32,
    pub clicked_count: i32,
    pub replied_count: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Per-variant rates reported by the API.
#[derive(Debug, Clone, Serialize)]
pub struct VariantReport {
    pub variant_id: String,
    pub sent_count: i32,
    pub open_rate: f64,
    pub click_rate: f64,
    pub reply_rate: f64,
}

impl From<&AbTestResult> for VariantReport {
    fn from(r: &AbTestResult) -> Self {
        let sent = i64::from(r.sent_count);
        Self {
            variant_id: r.variant_id.clone(),
            sent_count: r.sent_count,
            open_rate: rate_percent(r.opened_count.into(), sent),
            click_rate: rate_percent(r.clicked_count.into(), sent),
            reply_rate: rate_percent(r.replied_count.into(), sent),
        }
    }
}

/// Which counter an engagement event increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbCounter {
    Sent,
    Opened,
    Clicked,
    Replied,
}

impl AbCounter {
    pub fn column(self) -> &'static str {
        match self {
            AbCounter::Sent => "sent_count",
            AbCounter::Opened => "opened_count",
            AbCounter::Clicked => "clicked_count",
            AbCounter::Replied => "replied_count",
        }
    }
}
