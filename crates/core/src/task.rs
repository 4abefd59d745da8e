//! Discovery task model: priorities, kinds, status state machine and the
//! timing rules used by the smart scheduler.
//!
//! Tasks are in-memory bookkeeping. The worker keeps them in a
//! [`Task`] map and drives them through [`state_machine`]; nothing here
//! survives a restart.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::platform::Platform;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default number of retries before a task is marked failed for good.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Multiplier applied to the base delay during a platform's peak hours.
pub const PEAK_HOUR_FACTOR: f64 = 1.5;

/// Multiplier applied to the base delay during a platform's off hours.
pub const OFF_HOUR_FACTOR: f64 = 0.5;

/// Multiplier applied to the base delay on a platform's busy weekdays.
pub const BUSY_DAY_FACTOR: f64 = 1.2;

// ---------------------------------------------------------------------------
// Priority / kind / status
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low = 1,
    #[default]
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl TaskPriority {
    /// Base delay before a newly scheduled task becomes due.
    pub fn base_delay(self) -> Duration {
        match self {
            TaskPriority::Low => Duration::seconds(3600),
            TaskPriority::Medium => Duration::seconds(1800),
            TaskPriority::High => Duration::seconds(300),
            TaskPriority::Critical => Duration::seconds(60),
        }
    }

    /// Numeric value stored in the `jobs.priority` column.
    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

/// What a discovery task fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Profile,
    Content,
    Network,
    Engagement,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Profile => "profile",
            TaskKind::Content => "content",
            TaskKind::Network => "network",
            TaskKind::Engagement => "engagement",
        }
    }
}

impl FromStr for TaskKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile" => Ok(TaskKind::Profile),
            "content" => Ok(TaskKind::Content),
            "network" => Ok(TaskKind::Network),
            "engagement" => Ok(TaskKind::Engagement),
            other => Err(CoreError::validation(format!("Unknown task type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Created,
    Started,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Created => "created",
            TaskStatus::Started => "started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Started | TaskStatus::InProgress)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task status state machine.
pub mod state_machine {
    use super::TaskStatus::{self, *};

    /// Returns the statuses reachable from `from`.
    ///
    /// `InProgress -> InProgress` is a progress update. `Failed -> Created`
    /// is a requeue; whether retries remain is the scheduler's call.
    pub fn valid_transitions(from: TaskStatus) -> &'static [TaskStatus] {
        match from {
            Created => &[Started, Cancelled],
            Started => &[InProgress, Completed, Failed, Cancelled],
            InProgress => &[InProgress, Completed, Failed, Cancelled],
            Failed => &[Created],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition(from: TaskStatus, to: TaskStatus) -> bool {
        valid_transitions(from).contains(&to)
    }

    pub fn validate_transition(from: TaskStatus, to: TaskStatus) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(format!("Invalid transition: {from} -> {to}"))
        }
    }
}

// ---------------------------------------------------------------------------
// Platform timing patterns
// ---------------------------------------------------------------------------

/// Observed activity pattern for a platform.
///
/// Hours are 0..=23 UTC, days are 0 (Monday) ..= 6 (Sunday).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformPattern {
    #[serde(default)]
    pub peak_hours: Vec<u32>,
    #[serde(default)]
    pub off_hours: Vec<u32>,
    #[serde(default)]
    pub busy_days: Vec<u32>,
}

impl PlatformPattern {
    /// Multiplier for the base delay at `at`.
    pub fn delay_factor(&self, at: Timestamp) -> f64 {
        let hour = at.hour();
        let mut factor = if self.peak_hours.contains(&hour) {
            PEAK_HOUR_FACTOR
        } else if self.off_hours.contains(&hour) {
            OFF_HOUR_FACTOR
        } else {
            1.0
        };
        if self.busy_days.contains(&at.weekday().num_days_from_monday()) {
            factor *= BUSY_DAY_FACTOR;
        }
        factor
    }
}

/// When a task scheduled at `now` should run.
pub fn optimal_time(
    now: Timestamp,
    priority: TaskPriority,
    pattern: Option<&PlatformPattern>,
) -> Timestamp {
    let base_ms = priority.base_delay().num_milliseconds() as f64;
    let factor = pattern.map_or(1.0, |p| p.delay_factor(now));
    now + Duration::milliseconds((base_ms * factor).round() as i64)
}

/// Delay before a due-but-blocked task is tried again: 2^retry minutes.
pub fn reschedule_backoff(retry_count: u32) -> Duration {
    Duration::minutes(2i64.saturating_pow(retry_count.min(16)))
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: DbId,
    pub kind: TaskKind,
    pub platform: Platform,
    pub priority: TaskPriority,
    pub dependencies: Vec<DbId>,
    pub status: TaskStatus,
    pub progress: u8,
    pub retry_count: u32,
    pub max_retries: u32,
    pub scheduled_at: Timestamp,
    pub target: serde_json::Value,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Task {
    pub fn new(id: DbId, kind: TaskKind, platform: Platform, priority: TaskPriority) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            platform,
            priority,
            dependencies: Vec::new(),
            status: TaskStatus::Created,
            progress: 0,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            scheduled_at: now,
            target: serde_json::Value::Null,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_dependencies(mut self, deps: Vec<DbId>) -> Self {
        self.dependencies = deps;
        self
    }

    pub fn with_target(mut self, target: serde_json::Value) -> Self {
        self.target = target;
        self
    }

    /// Move to `to`, rejecting transitions the state machine forbids.
    pub fn transition(&mut self, to: TaskStatus) -> Result<(), CoreError> {
        if !state_machine::can_transition(self.status, to) {
            return Err(CoreError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        if to == TaskStatus::Completed {
            self.progress = 100;
        }
        Ok(())
    }

    /// Record a progress update, entering `InProgress` if needed.
    pub fn report_progress(&mut self, percent: u8) -> Result<(), CoreError> {
        self.transition(TaskStatus::InProgress)?;
        self.progress = percent.min(100);
        Ok(())
    }

    pub fn retries_remaining(&self) -> bool {
        self.retry_count < self.max_retries
    }

    pub fn is_due(&self, now: Timestamp) -> bool {
        self.scheduled_at <= now
    }
}

/// Dispatch order: higher priority first, then earlier schedule, then id.
pub fn dispatch_order(a: &Task, b: &Task) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then(a.scheduled_at.cmp(&b.scheduled_at))
        .then(a.id.cmp(&b.id))
}

/// True when every dependency of `task` appears in `completed`.
pub fn dependencies_satisfied(task: &Task, completed: &HashSet<DbId>) -> bool {
    task.dependencies.iter().all(|d| completed.contains(d))
}
