//! In-memory smart scheduler for discovery tasks.
//!
//! Tasks wait in a queue kept in dispatch order (priority, then schedule
//! time, then id). A task becomes runnable once it is due and every
//! dependency has completed; concurrency slots bound how many run at once.
//! Nothing here is persisted: the `jobs` table records submission and the
//! final outcome, the queue itself is lost on restart.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use outreach_core::platform::Platform;
use outreach_core::task::{
    dependencies_satisfied, dispatch_order, optimal_time, reschedule_backoff, PlatformPattern,
    Task, TaskStatus,
};
use outreach_core::types::{DbId, Timestamp};
use serde::Serialize;

/// Default retry delay for failed executions.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Default number of tasks running at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    pub pending_tasks: usize,
    pub active_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
}

/// Result of one [`SmartScheduler::due_tasks`] pass.
#[derive(Debug, Default)]
pub struct DueTasks {
    /// Tasks moved to `Started`, in dispatch order.
    pub ready: Vec<Task>,
    /// Tasks that ran out of retries while waiting for a slot.
    pub failed: Vec<Task>,
}

/// What happened to a task reported as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// Back in the queue, due at the given time.
    Requeued(Timestamp),
    /// Out of retries.
    Failed,
}

pub struct SmartScheduler {
    pending: Vec<Task>,
    active: HashMap<DbId, Task>,
    completed: HashSet<DbId>,
    failed: HashMap<DbId, Task>,
    patterns: HashMap<Platform, PlatformPattern>,
    max_concurrent: usize,
    retry_delay: chrono::Duration,
}

impl Default for SmartScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT, DEFAULT_RETRY_DELAY)
    }
}

impl SmartScheduler {
    pub fn new(max_concurrent: usize, retry_delay: Duration) -> Self {
        Self {
            pending: Vec::new(),
            active: HashMap::new(),
            completed: HashSet::new(),
            failed: HashMap::new(),
            patterns: HashMap::new(),
            max_concurrent: max_concurrent.max(1),
            retry_delay: chrono::Duration::from_std(retry_delay)
                .unwrap_or_else(|_| chrono::Duration::seconds(60)),
        }
    }

    /// Register the activity pattern used to time tasks for `platform`.
    pub fn set_pattern(&mut self, platform: Platform, pattern: PlatformPattern) {
        self.patterns.insert(platform, pattern);
    }

    /// Queue a task. Without an explicit time the task runs at the optimal
    /// time for its priority and platform. Returns the chosen time.
    pub fn schedule(&mut self, mut task: Task, at: Option<Timestamp>, now: Timestamp) -> Timestamp {
        let scheduled_at =
            at.unwrap_or_else(|| {
                optimal_time(now, task.priority, self.patterns.get(&task.platform))
            });
        task.scheduled_at = scheduled_at;
        tracing::debug!(
            task_id = task.id,
            kind = task.kind.as_str(),
            platform = %task.platform,
            scheduled_at = %scheduled_at,
            "Task scheduled",
        );
        self.insert_pending(task);
        scheduled_at
    }

    /// Record tasks that completed elsewhere, e.g. in an earlier run.
    pub fn record_completed(&mut self, ids: impl IntoIterator<Item = DbId>) {
        self.completed.extend(ids);
    }

    /// Start every runnable task that fits in the free slots.
    ///
    /// A runnable task with no free slot is pushed back by
    /// `2^retry_count` minutes and its retry count grows; once retries
    /// are exhausted it fails instead.
    pub fn due_tasks(&mut self, now: Timestamp) -> DueTasks {
        let mut due = DueTasks::default();
        let mut free = self.max_concurrent.saturating_sub(self.active.len());
        let mut waiting = Vec::with_capacity(self.pending.len());

        for mut task in std::mem::take(&mut self.pending) {
            if !task.is_due(now) || !dependencies_satisfied(&task, &self.completed) {
                waiting.push(task);
                continue;
            }

            if free > 0 {
                if let Err(e) = task.transition(TaskStatus::Started) {
                    tracing::warn!(task_id = task.id, error = %e, "Task could not start");
                    waiting.push(task);
                    continue;
                }
                free -= 1;
                self.active.insert(task.id, task.clone());
                due.ready.push(task);
            } else if task.retries_remaining() {
                task.scheduled_at = now + reschedule_backoff(task.retry_count);
                task.retry_count += 1;
                tracing::debug!(
                    task_id = task.id,
                    retry_count = task.retry_count,
                    scheduled_at = %task.scheduled_at,
                    "No free slot, task rescheduled",
                );
                waiting.push(task);
            } else {
                // Never started, so no state-machine transition applies.
                task.status = TaskStatus::Failed;
                task.error = Some("Retries exhausted waiting for a free slot".to_string());
                task.updated_at = now;
                tracing::warn!(task_id = task.id, "Task failed, retries exhausted");
                self.failed.insert(task.id, task.clone());
                due.failed.push(task);
            }
        }

        waiting.sort_by(dispatch_order);
        self.pending = waiting;
        due
    }

    /// Mark an active task completed. Returns the task, or `None` when it
    /// is not active (e.g. cancelled meanwhile).
    pub fn complete(&mut self, id: DbId) -> Option<Task> {
        let mut task = self.active.remove(&id)?;
        if let Err(e) = task.transition(TaskStatus::Completed) {
            tracing::warn!(task_id = id, error = %e, "Unexpected task state on completion");
            task.status = TaskStatus::Completed;
        }
        self.completed.insert(id);
        Some(task)
    }

    /// Mark an active task failed, requeueing it after the retry delay
    /// while retries remain.
    pub fn fail(&mut self, id: DbId, error: &str, now: Timestamp) -> Option<FailOutcome> {
        let mut task = self.active.remove(&id)?;
        if let Err(e) = task.transition(TaskStatus::Failed) {
            tracing::warn!(task_id = id, error = %e, "Unexpected task state on failure");
            task.status = TaskStatus::Failed;
        }
        task.error = Some(error.to_string());

        if task.retries_remaining() && task.transition(TaskStatus::Created).is_ok() {
            task.retry_count += 1;
            task.scheduled_at = now + self.retry_delay;
            let at = task.scheduled_at;
            tracing::info!(
                task_id = id,
                retry_count = task.retry_count,
                retry_at = %at,
                "Task requeued"
            );
            self.insert_pending(task);
            Some(FailOutcome::Requeued(at))
        } else {
            tracing::warn!(task_id = id, error, "Task failed");
            self.failed.insert(id, task);
            Some(FailOutcome::Failed)
        }
    }

    /// Cancel a pending or active task. Returns false when the task is not
    /// tracked.
    pub fn cancel(&mut self, id: DbId) -> bool {
        let task = match self.pending.iter().position(|t| t.id == id) {
            Some(index) => Some(self.pending.remove(index)),
            None => self.active.remove(&id),
        };
        match task {
            Some(mut task) => {
                if let Err(e) = task.transition(TaskStatus::Cancelled) {
                    tracing::warn!(task_id = id, error = %e, "Unexpected task state on cancel");
                }
                tracing::info!(task_id = id, "Task cancelled");
                true
            }
            None => false,
        }
    }

    /// Ids of tasks still queued or running.
    pub fn tracked_ids(&self) -> Vec<DbId> {
        self.pending
            .iter()
            .map(|t| t.id)
            .chain(self.active.keys().copied())
            .collect()
    }

    /// Dependencies of queued tasks that have not completed yet.
    pub fn unmet_dependencies(&self) -> Vec<DbId> {
        let mut ids: Vec<DbId> = self
            .pending
            .iter()
            .flat_map(|t| t.dependencies.iter().copied())
            .filter(|d| !self.completed.contains(d))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn pending(&self) -> &[Task] {
        &self.pending
    }

    pub fn failed_task(&self, id: DbId) -> Option<&Task> {
        self.failed.get(&id)
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            pending_tasks: self.pending.len(),
            active_tasks: self.active.len(),
            completed_tasks: self.completed.len(),
            failed_tasks: self.failed.len(),
        }
    }

    fn insert_pending(&mut self, task: Task) {
        let index = self
            .pending
            .partition_point(|t| dispatch_order(t, &task).is_lt());
        self.pending.insert(index, task);
    }
}
