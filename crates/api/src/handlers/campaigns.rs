//! Handlers for outreach campaigns and their sequences.
//!
//! Starting a campaign queues one `sequence_step` job per eligible
//! prospect; the worker sends the messages.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use outreach_core::error::CoreError;
use outreach_core::types::DbId;
use outreach_core::validation::{normalize_name, validate_min_score, validate_sequence_step};
use outreach_db::models::campaign::{Campaign, CampaignStartResult, CreateCampaign};
use outreach_db::models::job::{NewJob, SequenceStepPayload, JOB_SEQUENCE_STEP};
use outreach_db::models::sequence::CreateSequenceStep;
use outreach_db::models::status::CampaignStatus;
use outreach_db::repositories::{CampaignRepo, JobRepo, ProspectRepo, SequenceRepo, TemplateRepo};
use outreach_events::{event_types, PlatformEvent};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Campaign", id })
}

pub(crate) async fn find_campaign(state: &AppState, id: DbId) -> AppResult<Campaign> {
    CampaignRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))
}

/// Templates referenced by campaigns, steps and variants must exist and
/// be active.
pub(crate) async fn require_active_template(state: &AppState, template_id: DbId) -> AppResult<()> {
    TemplateRepo::find_active(&state.pool, template_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "MessageTemplate",
            id: template_id,
        }))?;
    Ok(())
}

/// POST /api/v1/campaigns
///
/// New campaigns start as drafts.
pub async fn create_campaign(
    State(state): State<AppState>,
    Json(input): Json<CreateCampaign>,
) -> AppResult<impl IntoResponse> {
    let name = normalize_name("name", &input.name)?;
    validate_min_score(input.target_criteria.min_score)?;
    require_active_template(&state, input.template_id).await?;

    let campaign =
        CampaignRepo::create(&state.pool, &name, input.template_id, &input.target_criteria).await?;

    tracing::info!(campaign_id = campaign.id, template_id = input.template_id, "Campaign created");
    Ok((StatusCode::CREATED, Json(campaign)))
}

/// GET /api/v1/campaigns?limit=&offset=
pub async fn list_campaigns(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let campaigns = CampaignRepo::list(
        &state.pool,
        outreach_db::clamp_limit(params.limit),
        outreach_db::clamp_offset(params.offset),
    )
    .await?;
    Ok(Json(DataResponse { data: campaigns }))
}

/// GET /api/v1/campaigns/{id}
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(find_campaign(&state, id).await?))
}

/// POST /api/v1/campaigns/{id}/start
///
/// Only drafts can start, and only when at least one consenting prospect
/// meets the campaign's `min_score`.
pub async fn start_campaign(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let campaign = find_campaign(&state, id).await?;
    if campaign.status_id != CampaignStatus::Draft.id() {
        return Err(AppError::BadRequest("Only draft campaigns can be started".into()));
    }

    let min_score = campaign.criteria().min_score.unwrap_or(0).clamp(0, 100) as i16;
    let targets = ProspectRepo::list_campaign_targets(&state.pool, min_score).await?;
    if targets.is_empty() {
        return Err(AppError::BadRequest(
            "No consenting prospects match the campaign's target criteria".into(),
        ));
    }

    let campaign =
        CampaignRepo::transition(&state.pool, id, CampaignStatus::Draft, CampaignStatus::Active)
            .await?
            .ok_or_else(|| AppError::BadRequest("Only draft campaigns can be started".into()))?;

    for prospect in &targets {
        let payload = SequenceStepPayload { campaign_id: id, prospect_id: prospect.id };
        let job = NewJob::new(JOB_SEQUENCE_STEP, payload)
            .map_err(|e| AppError::InternalError(e.to_string()))?;
        JobRepo::enqueue(&state.pool, &job).await?;
    }

    state.event_bus.publish(
        PlatformEvent::new(event_types::CAMPAIGN_STARTED)
            .with_source("campaign", id)
            .with_payload(json!({ "prospects_targeted": targets.len() })),
    );
    tracing::info!(campaign_id = id, prospects_targeted = targets.len(), "Campaign started");

    Ok(Json(CampaignStartResult { campaign, prospects_targeted: targets.len() }))
}

/// POST /api/v1/campaigns/{id}/pause
///
/// Queued steps of a paused campaign wait until it resumes.
pub async fn pause_campaign(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let campaign = move_campaign(&state, id, CampaignStatus::Active, CampaignStatus::Paused).await?;
    state.event_bus.publish(
        PlatformEvent::new(event_types::CAMPAIGN_PAUSED).with_source("campaign", id),
    );
    Ok(Json(campaign))
}

/// POST /api/v1/campaigns/{id}/resume
pub async fn resume_campaign(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let campaign = move_campaign(&state, id, CampaignStatus::Paused, CampaignStatus::Active).await?;
    Ok(Json(campaign))
}

async fn move_campaign(
    state: &AppState,
    id: DbId,
    from: CampaignStatus,
    to: CampaignStatus,
) -> AppResult<Campaign> {
    if let Some(campaign) = CampaignRepo::transition(&state.pool, id, from, to).await? {
        tracing::info!(
            campaign_id = id,
            from = from.name(),
            to = to.name(),
            "Campaign status changed"
        );
        return Ok(campaign);
    }
    let current = find_campaign(state, id).await?;
    let current =
        CampaignStatus::from_id(current.status_id).map_or("unknown", CampaignStatus::name);
    Err(AppError::Core(CoreError::InvalidTransition {
        from: current.to_string(),
        to: to.name().to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Sequences
// ---------------------------------------------------------------------------

/// GET /api/v1/campaigns/{id}/sequences
pub async fn list_sequence_steps(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_campaign(&state, id).await?;
    let steps = SequenceRepo::list_for_campaign(&state.pool, id).await?;
    Ok(Json(DataResponse { data: steps }))
}

/// POST /api/v1/campaigns/{id}/sequences
///
/// A step number already used in the campaign returns 409.
pub async fn add_sequence_step(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CreateSequenceStep>,
) -> AppResult<impl IntoResponse> {
    validate_sequence_step(input.step_number, input.delay_days)?;
    find_campaign(&state, id).await?;
    require_active_template(&state, input.template_id).await?;

    let step = SequenceRepo::create(&state.pool, id, &input).await?;

    tracing::info!(campaign_id = id, step_number = step.step_number, "Sequence step added");
    Ok((StatusCode::CREATED, Json(step)))
}

/// DELETE /api/v1/campaigns/{id}/sequences/{step_id}
pub async fn remove_sequence_step(
    State(state): State<AppState>,
    Path((id, step_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    if !SequenceRepo::delete(&state.pool, id, step_id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "SequenceStep", id: step_id }));
    }
    Ok(StatusCode::NO_CONTENT)
}
