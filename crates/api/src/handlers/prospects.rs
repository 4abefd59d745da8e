//! Handlers for affiliate prospects.
//!
//! Creating a prospect or asking for a re-score queues a
//! `score_prospect` job for the worker.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use outreach_core::error::CoreError;
use outreach_core::types::DbId;
use outreach_core::validation::{normalize_email, validate_bulk_size, validate_website};
use outreach_db::models::job::{NewJob, ScoreProspectPayload, JOB_SCORE_PROSPECT};
use outreach_db::models::prospect::{
    BulkUpdateProspects, BulkUpdateResult, ConsentUpdate, CreateProspect, ProspectListParams,
    UpdateProspect,
};
use outreach_db::models::status::ProspectStatus;
use outreach_db::repositories::{JobRepo, ProspectRepo};
use outreach_events::{event_types, PlatformEvent};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Prospect", id })
}

async fn queue_scoring(state: &AppState, prospect_id: DbId) -> AppResult<DbId> {
    let job = JobRepo::enqueue(
        &state.pool,
        &NewJob::new(JOB_SCORE_PROSPECT, ScoreProspectPayload { prospect_id })
            .map_err(|e| AppError::InternalError(e.to_string()))?,
    )
    .await?;
    Ok(job.id)
}

/// POST /api/v1/prospects
///
/// Returns 409 when the email is already registered.
pub async fn create_prospect(
    State(state): State<AppState>,
    Json(input): Json<CreateProspect>,
) -> AppResult<impl IntoResponse> {
    validate_website(input.website.as_deref())?;
    let input = CreateProspect {
        email: normalize_email(&input.email)?,
        ..input
    };

    let prospect = ProspectRepo::create(&state.pool, &input).await?;
    let job_id = queue_scoring(&state, prospect.id).await?;

    state.event_bus.publish(
        PlatformEvent::new(event_types::PROSPECT_CREATED)
            .with_source("prospect", prospect.id)
            .with_payload(json!({ "email": prospect.email, "lead_source": prospect.lead_source })),
    );
    tracing::info!(prospect_id = prospect.id, scoring_job_id = job_id, "Prospect created");

    Ok((StatusCode::CREATED, Json(prospect)))
}

/// GET /api/v1/prospects?status=&min_score=&limit=&offset=
pub async fn list_prospects(
    State(state): State<AppState>,
    Query(params): Query<ProspectListParams>,
) -> AppResult<impl IntoResponse> {
    let status_id = params
        .status
        .as_deref()
        .map(ProspectStatus::from_name)
        .transpose()?
        .map(ProspectStatus::id);

    let prospects = ProspectRepo::list(
        &state.pool,
        status_id,
        params.min_score,
        outreach_db::clamp_limit(params.limit),
        outreach_db::clamp_offset(params.offset),
    )
    .await?;

    Ok(Json(DataResponse { data: prospects }))
}

/// GET /api/v1/prospects/{id}
pub async fn get_prospect(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let prospect = ProspectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(prospect))
}

/// PUT /api/v1/prospects/{id}
///
/// Partial update. A `status` name moves the prospect to that status.
pub async fn update_prospect(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProspect>,
) -> AppResult<impl IntoResponse> {
    validate_website(input.website.as_deref())?;
    let new_status = input.status.as_deref().map(ProspectStatus::from_name).transpose()?;

    let before = ProspectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let prospect = ProspectRepo::update(&state.pool, id, &input, new_status.map(ProspectStatus::id))
        .await?
        .ok_or_else(|| not_found(id))?;

    state.event_bus.publish(
        PlatformEvent::new(event_types::PROSPECT_UPDATED).with_source("prospect", id),
    );
    if prospect.status_id != before.status_id {
        publish_status_change(&state, id, before.status_id, prospect.status_id);
    }

    Ok(Json(prospect))
}

/// PUT /api/v1/prospects/{id}/consent
pub async fn set_consent(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ConsentUpdate>,
) -> AppResult<impl IntoResponse> {
    let prospect = ProspectRepo::set_consent(&state.pool, id, input.consent_given)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(prospect_id = id, consent_given = input.consent_given, "Consent updated");
    Ok(Json(prospect))
}

/// POST /api/v1/prospects/bulk-update
pub async fn bulk_update_status(
    State(state): State<AppState>,
    Json(input): Json<BulkUpdateProspects>,
) -> AppResult<impl IntoResponse> {
    validate_bulk_size(input.prospect_ids.len())?;
    let status = ProspectStatus::from_name(&input.status)?;

    let updated = ProspectRepo::bulk_update_status(&state.pool, &input.prospect_ids, status).await?;

    tracing::info!(updated, status = status.name(), "Bulk prospect status update");
    Ok(Json(BulkUpdateResult { updated }))
}

/// DELETE /api/v1/prospects/{id}/unsubscribe
///
/// Revokes consent and marks the prospect declined. The record is kept.
pub async fn unsubscribe(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let before = ProspectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let prospect = ProspectRepo::unsubscribe(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    if before.status_id != prospect.status_id {
        publish_status_change(&state, id, before.status_id, prospect.status_id);
    }
    tracing::info!(prospect_id = id, "Prospect unsubscribed");
    Ok(Json(prospect))
}

/// DELETE /api/v1/prospects/{id}
///
/// GDPR erasure: the row is soft-deleted and its personal data redacted.
pub async fn delete_prospect(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !ProspectRepo::redact(&state.pool, id).await? {
        return Err(not_found(id));
    }

    state.event_bus.publish(
        PlatformEvent::new(event_types::PROSPECT_DELETED).with_source("prospect", id),
    );
    tracing::info!(prospect_id = id, "Prospect erased");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/prospects/{id}/score
pub async fn rescore_prospect(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ProspectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let job_id = queue_scoring(&state, id).await?;

    Ok((StatusCode::ACCEPTED, Json(json!({ "prospect_id": id, "job_id": job_id }))))
}

fn publish_status_change(state: &AppState, id: DbId, from: i16, to: i16) {
    let name = |status_id| ProspectStatus::from_id(status_id).map(ProspectStatus::name);
    state.event_bus.publish(
        PlatformEvent::new(event_types::PROSPECT_STATUS_CHANGED)
            .with_source("prospect", id)
            .with_payload(json!({ "from": name(from), "to": name(to) })),
    );
}
