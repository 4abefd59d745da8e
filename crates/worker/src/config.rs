//! Worker configuration loaded from environment variables.

use std::time::Duration;

/// Tunables for the job dispatcher, the smart scheduler and the task
/// manager.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub poll_interval: Duration,
    pub max_concurrent_tasks: usize,
    pub task_timeout: Duration,
    pub task_retry_delay: Duration,
    pub task_max_retries: u32,
    pub result_retention: Duration,
    pub scheduler_interval: Duration,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                  | Default |
    /// |---------------------------|---------|
    /// | `DATABASE_URL`            | required |
    /// | `JOB_POLL_INTERVAL_MS`    | `1000`  |
    /// | `MAX_CONCURRENT_TASKS`    | `5`     |
    /// | `TASK_TIMEOUT_SECS`       | `300`   |
    /// | `TASK_RETRY_DELAY_SECS`   | `60`    |
    /// | `TASK_MAX_RETRIES`        | `3`     |
    /// | `RESULT_RETENTION_HOURS`  | `24`    |
    /// | `SCHEDULER_INTERVAL_SECS` | `1`     |
    pub fn from_env() -> Result<Self, std::env::VarError> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")?,
            poll_interval: Duration::from_millis(parse_or("JOB_POLL_INTERVAL_MS", 1000)),
            max_concurrent_tasks: parse_or("MAX_CONCURRENT_TASKS", 5usize).max(1),
            task_timeout: Duration::from_secs(parse_or("TASK_TIMEOUT_SECS", 300)),
            task_retry_delay: Duration::from_secs(parse_or("TASK_RETRY_DELAY_SECS", 60)),
            task_max_retries: parse_or("TASK_MAX_RETRIES", 3),
            result_retention: Duration::from_secs(parse_or("RESULT_RETENTION_HOURS", 24u64) * 3600),
            scheduler_interval: Duration::from_secs(
                parse_or("SCHEDULER_INTERVAL_SECS", 1u64).max(1),
            ),
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
