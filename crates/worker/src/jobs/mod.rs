//! Background job dispatcher for prospect scoring and sequence steps.
//!
//! Polls the `jobs` table every `poll_interval`, claiming due jobs with
//! `SELECT FOR UPDATE SKIP LOCKED` via [`JobRepo::claim_next`] so several
//! workers can share the queue. Discovery jobs are claimed separately by
//! the [`DiscoveryRunner`](crate::discovery::DiscoveryRunner).

pub mod score;
pub mod sequence;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use outreach_channels::ChannelRegistry;
use outreach_core::types::Timestamp;
use outreach_db::models::job::{Job, JOB_SCORE_PROSPECT, JOB_SEQUENCE_STEP};
use outreach_db::repositories::JobRepo;
use outreach_events::EventBus;
use outreach_pipeline::DiscoveryPipeline;
use serde_json::{json, Value};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::error::JobError;

/// Job types this dispatcher handles.
pub const HANDLED_JOB_TYPES: [&str; 2] = [JOB_SCORE_PROSPECT, JOB_SEQUENCE_STEP];

/// Most jobs claimed in one poll.
const CLAIM_BATCH: usize = 20;

/// Shared dependencies of the job handlers.
pub struct JobContext {
    pub pool: PgPool,
    pub channels: Arc<ChannelRegistry>,
    pub bus: Arc<EventBus>,
    pub pipeline: DiscoveryPipeline,
}

/// How a handled job ends.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Finished; the value is stored as the job result.
    Done(Value),
    /// Not yet; put the job back in the queue. Does not use up an attempt.
    Retry { at: Timestamp, reason: String },
}

impl JobOutcome {
    /// A finished job that did nothing, with the reason as its result.
    pub fn skipped(reason: &str) -> Self {
        JobOutcome::Done(json!({ "skipped": reason }))
    }
}

pub struct JobDispatcher {
    ctx: Arc<JobContext>,
    poll_interval: Duration,
    max_attempts: i32,
    retry_delay: chrono::Duration,
}

impl JobDispatcher {
    pub fn new(ctx: Arc<JobContext>, poll_interval: Duration) -> Self {
        Self {
            ctx,
            poll_interval,
            max_attempts: 4,
            retry_delay: chrono::Duration::seconds(60),
        }
    }

    /// Failed attempts allowed per job, and the base delay between them.
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_attempts = i32::try_from(max_retries).unwrap_or(i32::MAX).saturating_add(1);
        self.retry_delay =
            chrono::Duration::from_std(retry_delay).unwrap_or(chrono::Duration::seconds(60));
        self
    }

    /// Run the dispatcher loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Job dispatcher started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Job dispatcher shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.try_dispatch().await {
                        tracing::error!(error = %e, "Dispatch cycle failed");
                    }
                }
            }
        }
    }

    /// One dispatch cycle. Returns the number of jobs processed.
    pub async fn try_dispatch(&self) -> Result<usize, sqlx::Error> {
        let mut processed = 0;
        while processed < CLAIM_BATCH {
            let Some(job) = JobRepo::claim_next(&self.ctx.pool, &HANDLED_JOB_TYPES).await? else {
                break;
            };
            self.process(job).await?;
            processed += 1;
        }
        Ok(processed)
    }

    /// Handle one claimed job and record how it ended.
    pub async fn process(&self, job: Job) -> Result<(), sqlx::Error> {
        let pool = &self.ctx.pool;
        tracing::debug!(
            job_id = job.id,
            job_type = %job.job_type,
            attempt = job.attempts,
            "Job claimed"
        );

        match handle(&self.ctx, &job).await {
            Ok(JobOutcome::Done(result)) => {
                JobRepo::complete(pool, job.id, &result).await?;
                tracing::info!(job_id = job.id, job_type = %job.job_type, "Job completed");
            }
            Ok(JobOutcome::Retry { at, reason }) => {
                JobRepo::defer(pool, job.id, at, &reason).await?;
                tracing::info!(job_id = job.id, retry_at = %at, reason = %reason, "Job deferred");
            }
            Err(e) if e.is_permanent() || job.attempts >= self.max_attempts => {
                JobRepo::fail(pool, job.id, &e.to_string()).await?;
                tracing::error!(
                    job_id = job.id,
                    job_type = %job.job_type,
                    error = %e,
                    "Job failed"
                );
            }
            Err(e) => {
                let at = Utc::now() + self.retry_delay * job.attempts.max(1);
                JobRepo::reschedule(pool, job.id, at, Some(&e.to_string())).await?;
                tracing::warn!(job_id = job.id, retry_at = %at, error = %e, "Job will be retried");
            }
        }
        Ok(())
    }
}

/// Route a job to its handler.
pub async fn handle(ctx: &JobContext, job: &Job) -> Result<JobOutcome, JobError> {
    match job.job_type.as_str() {
        JOB_SCORE_PROSPECT => score::run(ctx, serde_json::from_value(job.payload.clone())?).await,
        JOB_SEQUENCE_STEP => {
            sequence::run(ctx, serde_json::from_value(job.payload.clone())?).await
        }
        other => Err(JobError::UnknownType(other.to_string())),
    }
}
