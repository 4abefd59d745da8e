//! Worker error types.

use outreach_channels::ChannelError;
use outreach_core::error::CoreError;
use outreach_pipeline::PipelineError;

/// Why a discovery task did not produce a result.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Rate limiter closed: {0}")]
    RateLimiter(#[from] tokio::sync::AcquireError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] ChannelError),

    #[error("Pipeline rejected the data: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error(transparent)]
    State(#[from] CoreError),
}

/// Why a queued job could not be processed.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] ChannelError),

    #[error("{entity} {id} not found")]
    Missing { entity: &'static str, id: i64 },

    #[error("Unknown job type: {0}")]
    UnknownType(String),
}

impl JobError {
    /// Errors that a later attempt cannot fix.
    pub fn is_permanent(&self) -> bool {
        match self {
            JobError::Payload(_) | JobError::Missing { .. } | JobError::UnknownType(_) => true,
            JobError::Delivery(e) => e.is_permanent(),
            JobError::Database(_) => false,
        }
    }
}
