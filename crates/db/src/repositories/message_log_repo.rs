//! Repository for the `message_logs` table, including response analytics.

use outreach_core::analytics::ResponseCounts;
use outreach_core::responses::{NEGATIVE_THRESHOLD, POSITIVE_THRESHOLD};
use outreach_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::message_log::{MessageLog, NewMessageLog, TrackedMessage};
use crate::models::status::{MessageStatus, StatusId};

const COLUMNS: &str = "\
    id, prospect_id, campaign_id, template_id, message_type, subject, content, \
    step_number, status_id, sent_at, opened_at, clicked_at, replied_at, \
    ab_test_variant, sentiment_score, metadata, created_at, updated_at";

pub struct MessageLogRepo;

impl MessageLogRepo {
    /// Insert a log row. `sent_at` is stamped when the status is `Sent`.
    pub async fn create(pool: &PgPool, input: &NewMessageLog) -> Result<MessageLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO message_logs \
                (prospect_id, campaign_id, template_id, message_type, subject, content, \
                 step_number, status_id, sent_at, ab_test_variant, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, \
                     CASE WHEN $8 = $11 THEN NOW() ELSE NULL END, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MessageLog>(&query)
            .bind(input.prospect_id)
            .bind(input.campaign_id)
            .bind(input.template_id)
            .bind(&input.message_type)
            .bind(&input.subject)
            .bind(&input.content)
            .bind(input.step_number)
            .bind(input.status_id)
            .bind(&input.ab_test_variant)
            .bind(&input.metadata)
            .bind(MessageStatus::Sent.id())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MessageLog>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM message_logs WHERE id = $1");
        sqlx::query_as::<_, MessageLog>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        prospect_id: Option<DbId>,
        campaign_id: Option<DbId>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM message_logs \
             WHERE ($1::BIGINT IS NULL OR prospect_id = $1) \
               AND ($2::BIGINT IS NULL OR campaign_id = $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, MessageLog>(&query)
            .bind(prospect_id)
            .bind(campaign_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// The last sequence message logged for a prospect in a campaign.
    pub async fn last_sequence_message(
        pool: &PgPool,
        prospect_id: DbId,
        campaign_id: DbId,
    ) -> Result<Option<MessageLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM message_logs \
             WHERE prospect_id = $1 AND campaign_id = $2 AND step_number IS NOT NULL \
             ORDER BY step_number DESC, id DESC LIMIT 1"
        );
        sqlx::query_as::<_, MessageLog>(&query)
            .bind(prospect_id)
            .bind(campaign_id)
            .fetch_optional(pool)
            .await
    }

    /// Whether the prospect has replied to any message of the campaign.
    pub async fn has_reply(
        pool: &PgPool,
        prospect_id: DbId,
        campaign_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS( \
                SELECT 1 FROM message_logs \
                WHERE prospect_id = $1 AND campaign_id = $2 AND replied_at IS NOT NULL)",
        )
        .bind(prospect_id)
        .bind(campaign_id)
        .fetch_one(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Response tracking
    // -----------------------------------------------------------------------

    /// Record an open. Status never moves backwards, so an open arriving
    /// after a reply keeps the message `Replied`.
    pub async fn mark_opened(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TrackedMessage>, sqlx::Error> {
        Self::track(pool, id, MessageStatus::Opened, "opened_at", "", None).await
    }

    /// Record a click. A click implies an open.
    pub async fn mark_clicked(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TrackedMessage>, sqlx::Error> {
        Self::track(
            pool,
            id,
            MessageStatus::Clicked,
            "clicked_at",
            ", opened_at = COALESCE(opened_at, NOW())",
            None,
        )
        .await
    }

    pub async fn mark_replied(
        pool: &PgPool,
        id: DbId,
        sentiment_score: Option<f64>,
    ) -> Result<Option<TrackedMessage>, sqlx::Error> {
        Self::track(
            pool,
            id,
            MessageStatus::Replied,
            "replied_at",
            "",
            sentiment_score,
        )
        .await
    }

    /// Stamp `column` if it is unset, raise the status to `status` and keep
    /// the sentiment score unless a new one is given.
    ///
    /// The row is locked before `column` is read, so of several concurrent
    /// updates exactly one reports `first_event`.
    async fn track(
        pool: &PgPool,
        id: DbId,
        status: MessageStatus,
        column: &str,
        extra: &str,
        sentiment_score: Option<f64>,
    ) -> Result<Option<TrackedMessage>, sqlx::Error> {
        let query = format!(
            "WITH prior AS ( \
                SELECT id AS log_id, {column} IS NULL AS first_event \
                FROM message_logs WHERE id = $1 FOR UPDATE \
             ) \
             UPDATE message_logs SET \
                status_id = CASE WHEN status_id < $2 THEN $2 ELSE status_id END, \
                sentiment_score = COALESCE($3, sentiment_score), \
                {column} = COALESCE({column}, NOW()){extra} \
             FROM prior \
             WHERE message_logs.id = prior.log_id \
             RETURNING {COLUMNS}, prior.first_event"
        );
        sqlx::query_as::<_, TrackedMessage>(&query)
            .bind(id)
            .bind(StatusId::from(status))
            .bind(sentiment_score)
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Analytics
    // -----------------------------------------------------------------------

    /// Aggregate counters over messages sent since `since`.
    pub async fn response_counts(
        pool: &PgPool,
        campaign_id: Option<DbId>,
        since: Timestamp,
    ) -> Result<ResponseCounts, sqlx::Error> {
        let (total, opens, clicks, replies, positive, negative): (i64, i64, i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT COUNT(*), \
                        COUNT(*) FILTER (WHERE opened_at IS NOT NULL), \
                        COUNT(*) FILTER (WHERE clicked_at IS NOT NULL), \
                        COUNT(*) FILTER (WHERE replied_at IS NOT NULL), \
                        COUNT(*) FILTER (WHERE sentiment_score > $3), \
                        COUNT(*) FILTER (WHERE sentiment_score < $4) \
                 FROM message_logs \
                 WHERE sent_at >= $2 AND ($1::BIGINT IS NULL OR campaign_id = $1)",
            )
            .bind(campaign_id)
            .bind(since)
            .bind(POSITIVE_THRESHOLD)
            .bind(NEGATIVE_THRESHOLD)
            .fetch_one(pool)
            .await?;
        Ok(ResponseCounts { total, opens, clicks, replies, positive, negative })
    }

    /// Hours between send and reply for each replied message since `since`.
    pub async fn response_hours(
        pool: &PgPool,
        campaign_id: Option<DbId>,
        since: Timestamp,
    ) -> Result<Vec<f64>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT (EXTRACT(EPOCH FROM replied_at - sent_at) / 3600.0)::DOUBLE PRECISION \
             FROM message_logs \
             WHERE sent_at >= $2 AND replied_at IS NOT NULL \
               AND ($1::BIGINT IS NULL OR campaign_id = $1)",
        )
        .bind(campaign_id)
        .bind(since)
        .fetch_all(pool)
        .await
    }
}
