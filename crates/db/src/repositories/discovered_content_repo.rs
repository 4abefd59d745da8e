//! Repository for the `discovered_content` table.

use outreach_core::types::DbId;
use sqlx::PgPool;

use crate::models::discovered_content::{DiscoveredContent, NewDiscoveredContent};

const COLUMNS: &str =
    "id, job_id, name, content_type, platform, url, data, score, created_at, updated_at";

pub struct DiscoveredContentRepo;

impl DiscoveredContentRepo {
    pub async fn create(
        pool: &PgPool,
        input: &NewDiscoveredContent,
    ) -> Result<DiscoveredContent, sqlx::Error> {
        let query = format!(
            "INSERT INTO discovered_content \
                (job_id, name, content_type, platform, url, data, score) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DiscoveredContent>(&query)
            .bind(input.job_id)
            .bind(&input.name)
            .bind(&input.content_type)
            .bind(&input.platform)
            .bind(&input.url)
            .bind(&input.data)
            .bind(input.score)
            .fetch_one(pool)
            .await
    }

    pub async fn list_for_job(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Vec<DiscoveredContent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM discovered_content WHERE job_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, DiscoveredContent>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }
}
