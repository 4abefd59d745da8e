//! Handlers for discovery tasks.
//!
//! Tasks are stored as `discovery` jobs. The worker's scheduler claims
//! them, fetches the profile and runs it through the discovery pipeline.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use outreach_core::error::CoreError;
use outreach_core::types::{DbId, Timestamp};
use outreach_db::models::discovered_content::DiscoveredContent;
use outreach_db::models::job::{DiscoveryTaskPayload, Job, NewJob, JOB_DISCOVERY};
use outreach_db::models::status::JobStatus;
use outreach_db::repositories::{DiscoveredContentRepo, JobRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// A discovery job as reported by the API.
#[derive(Debug, Serialize)]
pub struct DiscoveryTaskView {
    pub id: DbId,
    pub status: &'static str,
    pub attempts: i32,
    pub payload: serde_json::Value,
    pub scheduled_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub last_error: Option<String>,
    pub result: Option<serde_json::Value>,
    pub discovered: Vec<DiscoveredContent>,
}

impl DiscoveryTaskView {
    fn new(job: Job, discovered: Vec<DiscoveredContent>) -> Self {
        Self {
            id: job.id,
            status: JobStatus::from_id(job.status_id).map_or("unknown", JobStatus::name),
            attempts: job.attempts,
            payload: job.payload,
            scheduled_at: job.scheduled_at,
            completed_at: job.completed_at,
            last_error: job.last_error,
            result: job.result,
            discovered,
        }
    }
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "DiscoveryTask", id })
}

/// POST /api/v1/discovery/tasks
pub async fn submit_task(
    State(state): State<AppState>,
    Json(input): Json<DiscoveryTaskPayload>,
) -> AppResult<impl IntoResponse> {
    for &dependency in &input.dependencies {
        JobRepo::find_typed(&state.pool, dependency, JOB_DISCOVERY)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::validation(format!(
                    "Dependency {dependency} is not a discovery task"
                )))
            })?;
    }

    let priority = input.priority.as_i16();
    let job = NewJob::new(JOB_DISCOVERY, &input)
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .with_priority(priority);
    let job = JobRepo::enqueue(&state.pool, &job).await?;

    tracing::info!(
        job_id = job.id,
        kind = input.kind.as_str(),
        platform = input.platform.as_str(),
        "Discovery task queued",
    );
    Ok((StatusCode::ACCEPTED, Json(DiscoveryTaskView::new(job, Vec::new()))))
}

/// GET /api/v1/discovery/tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::find_typed(&state.pool, id, JOB_DISCOVERY)
        .await?
        .ok_or_else(|| not_found(id))?;
    let discovered = DiscoveredContentRepo::list_for_job(&state.pool, id).await?;
    Ok(Json(DiscoveryTaskView::new(job, discovered)))
}

/// DELETE /api/v1/discovery/tasks/{id}
///
/// Cancels a pending or running task. A running task is aborted by the
/// worker on its next scheduling cycle. Finished tasks return 409.
pub async fn cancel_task(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    JobRepo::find_typed(&state.pool, id, JOB_DISCOVERY)
        .await?
        .ok_or_else(|| not_found(id))?;
    if !JobRepo::cancel(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Discovery task {id} has already finished"
        ))));
    }
    tracing::info!(job_id = id, "Discovery task cancelled");
    Ok(StatusCode::NO_CONTENT)
}
