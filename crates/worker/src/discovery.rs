//! Discovery task runner.
//!
//! Claims `discovery` jobs into the [`SmartScheduler`], starts due tasks
//! on the [`TaskManager`] and writes each final outcome back to the job
//! row. Completed tasks also store a `discovered_content` record. A job
//! cancelled through the API is dropped from the queue or aborted if it
//! is running.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use outreach_core::task::{Task, TaskKind, TaskStatus};
use outreach_core::types::DbId;
use outreach_db::models::discovered_content::NewDiscoveredContent;
use outreach_db::models::job::{DiscoveryTaskPayload, Job, JOB_DISCOVERY};
use outreach_db::repositories::{DiscoveredContentRepo, JobRepo};
use outreach_pipeline::{PipelineReport, BASIC_INFO};
use serde_json::{json, Value};
use sqlx::PgPool;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::scheduler::{FailOutcome, SmartScheduler};
use crate::task_manager::{TaskManager, TaskResult};

/// Most discovery jobs claimed per tick.
const CLAIM_BATCH: usize = 50;

pub struct DiscoveryRunner {
    pool: PgPool,
    scheduler: Arc<Mutex<SmartScheduler>>,
    manager: Arc<TaskManager>,
    interval: Duration,
    max_retries: u32,
    result_retention: Duration,
}

impl DiscoveryRunner {
    pub fn new(pool: PgPool, scheduler: SmartScheduler, manager: TaskManager) -> Self {
        Self {
            pool,
            scheduler: Arc::new(Mutex::new(scheduler)),
            manager: Arc::new(manager),
            interval: Duration::from_secs(1),
            max_retries: outreach_core::task::DEFAULT_MAX_RETRIES,
            result_retention: Duration::from_secs(24 * 3600),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_result_retention(mut self, retention: Duration) -> Self {
        self.result_retention = retention;
        self
    }

    pub fn scheduler(&self) -> &Arc<Mutex<SmartScheduler>> {
        &self.scheduler
    }

    /// Run the scheduling loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Discovery runner started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Discovery runner shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e, "Discovery cycle failed");
                    }
                }
            }
        }
    }

    /// One cycle: claim new jobs, sync with the database, start due tasks.
    /// Returns the number of tasks started.
    pub async fn tick(&self) -> Result<usize, sqlx::Error> {
        self.claim_new().await?;
        self.sync().await?;

        let started = self.dispatch_due(Utc::now()).await;

        let dropped = self.manager.cleanup(self.result_retention).await;
        if dropped > 0 {
            tracing::debug!(dropped, "Old task results dropped");
        }
        Ok(started)
    }

    /// Spawn every task the scheduler has started, then write back the
    /// ones that ran out of retries waiting for a slot. A failed write is
    /// logged and leaves the remaining tasks alone.
    pub async fn dispatch_due(&self, now: chrono::DateTime<Utc>) -> usize {
        let due = self.scheduler.lock().await.due_tasks(now);

        let started = due.ready.len();
        for task in due.ready {
            let pool = self.pool.clone();
            let scheduler = Arc::clone(&self.scheduler);
            let manager = Arc::clone(&self.manager);
            tokio::spawn(async move {
                let kind = task.kind;
                let result = manager.execute(task).await;
                if let Err(e) = record_result(&pool, &scheduler, kind, &result).await {
                    tracing::error!(
                        task_id = result.task_id,
                        error = %e,
                        "Failed to record task result"
                    );
                }
            });
        }

        for task in &due.failed {
            let error = task.error.as_deref().unwrap_or("Retries exhausted");
            if let Err(e) = JobRepo::fail(&self.pool, task.id, error).await {
                tracing::error!(task_id = task.id, error = %e, "Failed to record slot exhaustion");
            }
        }
        started
    }

    async fn claim_new(&self) -> Result<(), sqlx::Error> {
        for _ in 0..CLAIM_BATCH {
            let Some(job) = JobRepo::claim_next(&self.pool, &[JOB_DISCOVERY]).await? else {
                break;
            };
            match task_from_job(&job, self.max_retries) {
                Ok((task, at)) => {
                    self.scheduler.lock().await.schedule(task, at, Utc::now());
                }
                Err(e) => {
                    tracing::warn!(job_id = job.id, error = %e, "Invalid discovery payload");
                    JobRepo::fail(&self.pool, job.id, &format!("Invalid discovery payload: {e}"))
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// Pick up dependencies completed by other workers and cancellations
    /// made through the API.
    async fn sync(&self) -> Result<(), sqlx::Error> {
        let (unmet, tracked) = {
            let scheduler = self.scheduler.lock().await;
            (scheduler.unmet_dependencies(), scheduler.tracked_ids())
        };

        if !unmet.is_empty() {
            let done = JobRepo::completed_ids(&self.pool, &unmet).await?;
            self.scheduler.lock().await.record_completed(done);
        }
        if !tracked.is_empty() {
            for id in JobRepo::cancelled_ids(&self.pool, &tracked).await? {
                self.scheduler.lock().await.cancel(id);
                self.manager.cancel(id).await;
            }
        }
        Ok(())
    }
}

/// Build the scheduler task for a claimed job, with its explicit schedule
/// if it has one.
pub fn task_from_job(
    job: &Job,
    max_retries: u32,
) -> Result<(Task, Option<chrono::DateTime<Utc>>), serde_json::Error> {
    let payload: DiscoveryTaskPayload = serde_json::from_value(job.payload.clone())?;
    let mut task = Task::new(job.id, payload.kind, payload.platform, payload.priority)
        .with_dependencies(payload.dependencies)
        .with_target(payload.target);
    task.max_retries = max_retries;
    Ok((task, payload.scheduled_at))
}

/// Write a finished execution back to the scheduler and the job row.
async fn record_result(
    pool: &PgPool,
    scheduler: &Mutex<SmartScheduler>,
    kind: TaskKind,
    result: &TaskResult,
) -> Result<(), sqlx::Error> {
    let id = result.task_id;
    match result.status {
        TaskStatus::Completed => {
            scheduler.lock().await.complete(id);
            let content_id = match &result.data {
                Some(report) => {
                    let record = discovered_content(id, kind, report);
                    Some(DiscoveredContentRepo::create(pool, &record).await?.id)
                }
                None => None,
            };
            JobRepo::complete(pool, id, &job_result(result, content_id)).await?;
        }
        TaskStatus::Cancelled => {
            scheduler.lock().await.cancel(id);
        }
        _ => {
            let error = result.error.as_deref().unwrap_or("Task failed");
            let outcome = scheduler.lock().await.fail(id, error, Utc::now());
            if outcome == Some(FailOutcome::Failed) {
                JobRepo::fail(pool, id, error).await?;
            }
        }
    }
    Ok(())
}

/// The `discovered_content` row for a processed task.
pub fn discovered_content(
    job_id: DbId,
    kind: TaskKind,
    report: &PipelineReport,
) -> NewDiscoveredContent {
    let object = &report.object;
    let name = object
        .section(BASIC_INFO)
        .and_then(|info| {
            ["name", "username"]
                .into_iter()
                .find_map(|key| info.get(key).and_then(Value::as_str))
        })
        .filter(|n| !n.trim().is_empty())
        .map_or_else(|| object.url.clone(), str::to_string);

    NewDiscoveredContent {
        job_id: Some(job_id),
        name,
        content_type: kind.as_str().to_string(),
        platform: object.platform.as_str().to_string(),
        url: object.url.clone(),
        data: Value::Object(object.data.clone()),
        score: report.score.as_ref().map(|s| s.qualification_score),
    }
}

fn job_result(result: &TaskResult, content_id: Option<DbId>) -> Value {
    json!({
        "status": result.status,
        "execution_time": result.execution_time,
        "discovered_content_id": content_id,
        "qualification_score": result
            .data
            .as_ref()
            .and_then(|r| r.score.as_ref())
            .map(|s| s.qualification_score),
        "validation": result.data.as_ref().map(|r| &r.validation),
        "stage_errors": result.data.as_ref().map(|r| &r.stage_errors),
    })
}
