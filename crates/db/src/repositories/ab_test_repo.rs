//! Repository for the `ab_tests` and `ab_test_results` tables.

use outreach_core::types::DbId;
use outreach_core::validation::AbVariant;
use sqlx::PgPool;

use crate::models::ab_test::{AbCounter, AbTest, AbTestResult};

const TEST_COLUMNS: &str = "id, campaign_id, name, variants, is_active, created_at, updated_at";

const RESULT_COLUMNS: &str = "\
    id, ab_test_id, variant_id, sent_count, opened_count, clicked_count, \
    replied_count, created_at, updated_at";

pub struct AbTestRepo;

impl AbTestRepo {
    /// Create a test and a zeroed result row per variant in one transaction.
    pub async fn create(
        pool: &PgPool,
        campaign_id: DbId,
        name: &str,
        variants: &[AbVariant],
    ) -> Result<AbTest, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let query = format!(
            "INSERT INTO ab_tests (campaign_id, name, variants) VALUES ($1, $2, $3) \
             RETURNING {TEST_COLUMNS}"
        );
        let test = sqlx::query_as::<_, AbTest>(&query)
            .bind(campaign_id)
            .bind(name)
            .bind(sqlx::types::Json(variants))
            .fetch_one(&mut *tx)
            .await?;
        for variant in variants {
            sqlx::query("INSERT INTO ab_test_results (ab_test_id, variant_id) VALUES ($1, $2)")
                .bind(test.id)
                .bind(&variant.variant_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(test)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<AbTest>, sqlx::Error> {
        let query = format!("SELECT {TEST_COLUMNS} FROM ab_tests WHERE id = $1");
        sqlx::query_as::<_, AbTest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The most recent active test for a campaign, if any.
    pub async fn find_active_for_campaign(
        pool: &PgPool,
        campaign_id: DbId,
    ) -> Result<Option<AbTest>, sqlx::Error> {
        let query = format!(
            "SELECT {TEST_COLUMNS} FROM ab_tests \
             WHERE campaign_id = $1 AND is_active \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        sqlx::query_as::<_, AbTest>(&query)
            .bind(campaign_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn results(
        pool: &PgPool,
        ab_test_id: DbId,
    ) -> Result<Vec<AbTestResult>, sqlx::Error> {
        let query = format!(
            "SELECT {RESULT_COLUMNS} FROM ab_test_results \
             WHERE ab_test_id = $1 ORDER BY variant_id ASC"
        );
        sqlx::query_as::<_, AbTestResult>(&query)
            .bind(ab_test_id)
            .fetch_all(pool)
            .await
    }

    /// Increment one counter for a variant.
    pub async fn increment(
        pool: &PgPool,
        ab_test_id: DbId,
        variant_id: &str,
        counter: AbCounter,
    ) -> Result<(), sqlx::Error> {
        let column = counter.column();
        let query = format!(
            "UPDATE ab_test_results SET {column} = {column} + 1 \
             WHERE ab_test_id = $1 AND variant_id = $2"
        );
        sqlx::query(&query)
            .bind(ab_test_id)
            .bind(variant_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Increment a counter on the campaign's active test, if it has one.
    pub async fn increment_for_campaign(
        pool: &PgPool,
        campaign_id: DbId,
        variant_id: &str,
        counter: AbCounter,
    ) -> Result<(), sqlx::Error> {
        if let Some(test) = Self::find_active_for_campaign(pool, campaign_id).await? {
            Self::increment(pool, test.id, variant_id, counter).await?;
        }
        Ok(())
    }
}
