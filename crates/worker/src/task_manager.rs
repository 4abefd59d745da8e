//! Executes discovery tasks and keeps their results.
//!
//! One execution takes a rate permit for the task's platform, fetches the
//! raw data from the [`ProfileSource`] and runs it through the
//! [`DiscoveryPipeline`], all bounded by the task timeout. Each run is a
//! separate Tokio task so it can be cancelled by id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use outreach_channels::{ProfileSource, RateLimiter};
use outreach_core::task::{Task, TaskStatus};
use outreach_core::types::{DbId, Timestamp};
use outreach_pipeline::{DiscoveryPipeline, PipelineReport};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;

use crate::error::TaskError;

/// Default upper bound on a single execution.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(300);

/// Outcome of one execution.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    pub task_id: DbId,
    /// `Completed`, `Failed` or `Cancelled`.
    pub status: TaskStatus,
    pub data: Option<PipelineReport>,
    pub error: Option<String>,
    /// Wall-clock seconds.
    pub execution_time: f64,
    pub finished_at: Timestamp,
}

pub struct TaskManager {
    source: Arc<dyn ProfileSource>,
    limiter: Arc<RateLimiter>,
    pipeline: DiscoveryPipeline,
    task_timeout: Duration,
    running: Mutex<HashMap<DbId, AbortHandle>>,
    results: Mutex<HashMap<DbId, TaskResult>>,
}

impl TaskManager {
    pub fn new(source: Arc<dyn ProfileSource>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            source,
            limiter,
            pipeline: DiscoveryPipeline::new(),
            task_timeout: DEFAULT_TASK_TIMEOUT,
            running: Mutex::new(HashMap::new()),
            results: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Run `task` to completion, failure, timeout or cancellation and
    /// record the result.
    pub async fn execute(&self, task: Task) -> TaskResult {
        let task_id = task.id;
        let started = Instant::now();
        tracing::info!(
            task_id,
            kind = task.kind.as_str(),
            platform = %task.platform,
            "Executing discovery task",
        );

        let handle = tokio::spawn(run_task(
            Arc::clone(&self.source),
            Arc::clone(&self.limiter),
            self.pipeline,
            task,
        ));
        let abort = handle.abort_handle();
        self.running.lock().await.insert(task_id, handle.abort_handle());

        let outcome = tokio::time::timeout(self.task_timeout, handle).await;
        self.running.lock().await.remove(&task_id);

        let (status, data, error) = match outcome {
            Err(_) => {
                abort.abort();
                let err = TaskError::Timeout(self.task_timeout);
                (TaskStatus::Failed, None, Some(err.to_string()))
            }
            Ok(Err(join)) if join.is_cancelled() => {
                (TaskStatus::Cancelled, None, Some("Task cancelled".to_string()))
            }
            Ok(Err(join)) => (TaskStatus::Failed, None, Some(format!("Task panicked: {join}"))),
            Ok(Ok(Err(e))) => (TaskStatus::Failed, None, Some(e.to_string())),
            Ok(Ok(Ok(report))) => (TaskStatus::Completed, Some(report), None),
        };

        let result = TaskResult {
            task_id,
            status,
            data,
            error,
            execution_time: started.elapsed().as_secs_f64(),
            finished_at: Utc::now(),
        };
        match &result.error {
            Some(error) => {
                tracing::warn!(task_id, status = %status, error = %error, "Discovery task ended")
            }
            None => tracing::info!(
                task_id,
                execution_time = result.execution_time,
                "Discovery task completed",
            ),
        }
        self.results.lock().await.insert(task_id, result.clone());
        result
    }

    /// The recorded result of a finished task.
    pub async fn task_status(&self, id: DbId) -> Option<TaskResult> {
        self.results.lock().await.get(&id).cloned()
    }

    /// Ids of tasks currently executing.
    pub async fn active_tasks(&self) -> Vec<DbId> {
        self.running.lock().await.keys().copied().collect()
    }

    /// Abort a running task. Returns false when it is not running.
    pub async fn cancel(&self, id: DbId) -> bool {
        match self.running.lock().await.get(&id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Drop results older than `retention`. Returns how many were removed.
    pub async fn cleanup(&self, retention: Duration) -> usize {
        let retention =
            chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::hours(24));
        let cutoff = Utc::now() - retention;
        let mut results = self.results.lock().await;
        let before = results.len();
        results.retain(|_, r| r.finished_at >= cutoff);
        before - results.len()
    }
}

async fn run_task(
    source: Arc<dyn ProfileSource>,
    limiter: Arc<RateLimiter>,
    pipeline: DiscoveryPipeline,
    mut task: Task,
) -> Result<PipelineReport, TaskError> {
    let _permit = limiter.acquire(task.platform).await?;
    task.report_progress(10)?;

    let object = source.fetch(task.platform, task.kind, &task.target).await?;
    task.report_progress(50)?;

    let report = pipeline.process(object)?;
    task.report_progress(100)?;
    tracing::debug!(
        task_id = task.id,
        valid = report.validation.is_valid,
        "Discovery data processed",
    );
    Ok(report)
}
