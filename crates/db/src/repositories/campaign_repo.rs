//! Repository for the `outreach_campaigns` table.

use outreach_core::types::DbId;
use sqlx::PgPool;

use crate::models::campaign::{Campaign, CampaignCounters, TargetCriteria};
use crate::models::status::{CampaignStatus, MessageStatus};

const COLUMNS: &str =
    "id, name, template_id, target_criteria, status_id, started_at, created_at, updated_at";

pub struct CampaignRepo;

impl CampaignRepo {
    /// Insert a campaign in `Draft` status.
    pub async fn create(
        pool: &PgPool,
        name: &str,
        template_id: DbId,
        criteria: &TargetCriteria,
    ) -> Result<Campaign, sqlx::Error> {
        let query = format!(
            "INSERT INTO outreach_campaigns (name, template_id, target_criteria, status_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Campaign>(&query)
            .bind(name)
            .bind(template_id)
            .bind(sqlx::types::Json(criteria))
            .bind(CampaignStatus::Draft.id())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Campaign>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM outreach_campaigns WHERE id = $1");
        sqlx::query_as::<_, Campaign>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Campaign>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM outreach_campaigns \
             ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Campaign>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Move a campaign from `from` to `to` atomically.
    ///
    /// Returns `None` when the campaign does not exist or is not currently
    /// in `from`. Entering `Active` for the first time stamps `started_at`.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> Result<Option<Campaign>, sqlx::Error> {
        let query = format!(
            "UPDATE outreach_campaigns SET \
                status_id = $3, \
                started_at = CASE WHEN $3 = $4 THEN COALESCE(started_at, NOW()) \
                                  ELSE started_at END \
             WHERE id = $1 AND status_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Campaign>(&query)
            .bind(id)
            .bind(from.id())
            .bind(to.id())
            .bind(CampaignStatus::Active.id())
            .fetch_optional(pool)
            .await
    }

    /// Delivery and engagement counters across the campaign's messages.
    pub async fn counters(pool: &PgPool, id: DbId) -> Result<CampaignCounters, sqlx::Error> {
        sqlx::query_as::<_, CampaignCounters>(
            "SELECT \
                COUNT(*) AS total_messages, \
                COUNT(*) FILTER (WHERE sent_at IS NOT NULL) AS sent, \
                COUNT(*) FILTER (WHERE status_id = $2) AS bounced, \
                COUNT(*) FILTER (WHERE opened_at IS NOT NULL) AS opened, \
                COUNT(*) FILTER (WHERE clicked_at IS NOT NULL) AS clicked, \
                COUNT(*) FILTER (WHERE replied_at IS NOT NULL) AS replied \
             FROM message_logs WHERE campaign_id = $1",
        )
        .bind(id)
        .bind(MessageStatus::Bounced.id())
        .fetch_one(pool)
        .await
    }
}
