//! Repository for the `jobs` work queue.
//!
//! Workers claim jobs with `SELECT FOR UPDATE SKIP LOCKED`, so several
//! worker processes can poll the same table without double dispatch.

use outreach_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::job::{Job, NewJob};
use crate::models::status::{JobStatus, StatusId};

const COLUMNS: &str = "\
    id, job_type, payload, status_id, priority, scheduled_at, attempts, \
    last_error, result, claimed_at, completed_at, created_at, updated_at";

pub struct JobRepo;

impl JobRepo {
    pub async fn enqueue(pool: &PgPool, input: &NewJob) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (job_type, payload, status_id, priority, scheduled_at) \
             VALUES ($1, $2, $3, $4, COALESCE($5, NOW())) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(input.job_type)
            .bind(&input.payload)
            .bind(JobStatus::Pending.id())
            .bind(input.priority)
            .bind(input.scheduled_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a job of the given type.
    pub async fn find_typed(
        pool: &PgPool,
        id: DbId,
        job_type: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1 AND job_type = $2");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(job_type)
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim the highest-priority due job among `job_types`.
    pub async fn claim_next(
        pool: &PgPool,
        job_types: &[&str],
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET claimed_at = NOW(), status_id = $1, attempts = attempts + 1 \
             WHERE id = ( \
                 SELECT id FROM jobs \
                 WHERE status_id = $2 AND claimed_at IS NULL \
                   AND scheduled_at <= NOW() AND job_type = ANY($3) \
                 ORDER BY priority DESC, scheduled_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        let types: Vec<String> = job_types.iter().map(|t| t.to_string()).collect();
        sqlx::query_as::<_, Job>(&query)
            .bind(JobStatus::Running.id())
            .bind(JobStatus::Pending.id())
            .bind(types)
            .fetch_optional(pool)
            .await
    }

    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        result: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        Self::finish(pool, id, JobStatus::Completed, Some(result), None).await
    }

    pub async fn fail(pool: &PgPool, id: DbId, error: &str) -> Result<bool, sqlx::Error> {
        Self::finish(pool, id, JobStatus::Failed, None, Some(error)).await
    }

    /// Cancel a pending or running job. Returns false when the job is
    /// unknown or already finished.
    pub async fn cancel(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        Self::finish(pool, id, JobStatus::Cancelled, None, None).await
    }

    /// Move an unfinished job to a terminal status. A job cancelled while
    /// running keeps its cancelled status when the worker reports back.
    async fn finish(
        pool: &PgPool,
        id: DbId,
        status: JobStatus,
        result: Option<&serde_json::Value>,
        error: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status_id = $2, result = COALESCE($3, result), \
                last_error = COALESCE($4, last_error), completed_at = NOW() \
             WHERE id = $1 AND status_id IN ($5, $6)",
        )
        .bind(id)
        .bind(StatusId::from(status))
        .bind(result)
        .bind(error)
        .bind(JobStatus::Pending.id())
        .bind(JobStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Put a claimed job back in the queue to run at `at`. The claim still
    /// counts as an attempt.
    pub async fn reschedule(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
        error: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        Self::requeue(pool, id, at, error, 0).await
    }

    /// Put a claimed job back in the queue without counting the claim as an
    /// attempt, for jobs that were not ready to run yet.
    pub async fn defer(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
        reason: &str,
    ) -> Result<(), sqlx::Error> {
        Self::requeue(pool, id, at, Some(reason), 1).await
    }

    async fn requeue(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
        error: Option<&str>,
        refund: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs SET status_id = $2, claimed_at = NULL, scheduled_at = $3, \
                last_error = COALESCE($4, last_error), \
                attempts = GREATEST(attempts - $5, 0) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(JobStatus::Pending.id())
        .bind(at)
        .bind(error)
        .bind(refund)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Ids among `ids` whose job has completed.
    pub async fn completed_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<DbId>, sqlx::Error> {
        Self::ids_with_status(pool, ids, JobStatus::Completed).await
    }

    /// Ids among `ids` whose job was cancelled.
    pub async fn cancelled_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<DbId>, sqlx::Error> {
        Self::ids_with_status(pool, ids, JobStatus::Cancelled).await
    }

    async fn ids_with_status(
        pool: &PgPool,
        ids: &[DbId],
        status: JobStatus,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM jobs WHERE id = ANY($1) AND status_id = $2")
            .bind(ids)
            .bind(status.id())
            .fetch_all(pool)
            .await
    }

    /// Release jobs of `job_types` claimed longer than `stale_after_secs`
    /// ago, e.g. by a worker that crashed mid-job.
    pub async fn release_stale(
        pool: &PgPool,
        job_types: &[&str],
        stale_after_secs: i64,
    ) -> Result<u64, sqlx::Error> {
        let types: Vec<String> = job_types.iter().map(|t| t.to_string()).collect();
        let result = sqlx::query(
            "UPDATE jobs SET status_id = $1, claimed_at = NULL \
             WHERE status_id = $2 AND job_type = ANY($4) \
               AND claimed_at < NOW() - make_interval(secs => $3::DOUBLE PRECISION)",
        )
        .bind(JobStatus::Pending.id())
        .bind(JobStatus::Running.id())
        .bind(stale_after_secs as f64)
        .bind(types)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
