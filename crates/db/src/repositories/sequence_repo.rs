//! Repository for the `campaign_sequences` table.

use outreach_core::types::DbId;
use sqlx::PgPool;

use crate::models::sequence::{CreateSequenceStep, SequenceStep};

const COLUMNS: &str =
    "id, campaign_id, step_number, template_id, delay_days, condition, created_at, updated_at";

pub struct SequenceRepo;

impl SequenceRepo {
    /// Add a step. A duplicate step number violates
    /// `uq_campaign_sequences_campaign_step`.
    pub async fn create(
        pool: &PgPool,
        campaign_id: DbId,
        input: &CreateSequenceStep,
    ) -> Result<SequenceStep, sqlx::Error> {
        let query = format!(
            "INSERT INTO campaign_sequences \
                (campaign_id, step_number, template_id, delay_days, condition) \
             VALUES ($1, $2, $3, $4, COALESCE($5, '{{}}'::jsonb)) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SequenceStep>(&query)
            .bind(campaign_id)
            .bind(input.step_number)
            .bind(input.template_id)
            .bind(input.delay_days)
            .bind(&input.condition)
            .fetch_one(pool)
            .await
    }

    pub async fn list_for_campaign(
        pool: &PgPool,
        campaign_id: DbId,
    ) -> Result<Vec<SequenceStep>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM campaign_sequences \
             WHERE campaign_id = $1 ORDER BY step_number ASC"
        );
        sqlx::query_as::<_, SequenceStep>(&query)
            .bind(campaign_id)
            .fetch_all(pool)
            .await
    }

    /// The first step numbered above `after`.
    pub async fn next_step(
        pool: &PgPool,
        campaign_id: DbId,
        after: i32,
    ) -> Result<Option<SequenceStep>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM campaign_sequences \
             WHERE campaign_id = $1 AND step_number > $2 \
             ORDER BY step_number ASC LIMIT 1"
        );
        sqlx::query_as::<_, SequenceStep>(&query)
            .bind(campaign_id)
            .bind(after)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, campaign_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM campaign_sequences WHERE id = $1 AND campaign_id = $2")
                .bind(id)
                .bind(campaign_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
