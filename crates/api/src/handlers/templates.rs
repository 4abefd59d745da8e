//! Handlers for message templates.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use outreach_core::error::CoreError;
use outreach_core::message::MessageType;
use outreach_core::template::placeholders;
use outreach_core::types::DbId;
use outreach_core::validation::{normalize_name, validate_template_content};
use outreach_db::models::template::{CreateTemplate, UpdateTemplate};
use outreach_db::repositories::TemplateRepo;

use crate::error::{AppError, AppResult};
use crate::query::IncludeInactiveParams;
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "MessageTemplate", id })
}

/// POST /api/v1/templates
///
/// Rejects blank content and unknown message types with 400.
pub async fn create_template(
    State(state): State<AppState>,
    Json(input): Json<CreateTemplate>,
) -> AppResult<impl IntoResponse> {
    let name = normalize_name("name", &input.name)?;
    validate_template_content(&input.content)?;
    let message_type: MessageType = input.message_type.trim().parse()?;

    let input = CreateTemplate {
        name,
        message_type: message_type.as_str().to_string(),
        ..input
    };
    let template = TemplateRepo::create(&state.pool, &input).await?;

    tracing::info!(
        template_id = template.id,
        message_type = %message_type,
        placeholders = ?placeholders(&template.content),
        "Template created",
    );
    Ok((StatusCode::CREATED, Json(template)))
}

/// GET /api/v1/templates?include_inactive=
pub async fn list_templates(
    State(state): State<AppState>,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<impl IntoResponse> {
    let templates = TemplateRepo::list(&state.pool, params.include_inactive).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// GET /api/v1/templates/{id}
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let template = TemplateRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(template))
}

/// PUT /api/v1/templates/{id}
pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTemplate>,
) -> AppResult<impl IntoResponse> {
    let name = input.name.as_deref().map(|n| normalize_name("name", n)).transpose()?;
    if let Some(content) = &input.content {
        validate_template_content(content)?;
    }

    let input = UpdateTemplate { name, ..input };
    let template = TemplateRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(template_id = id, "Template updated");
    Ok(Json(template))
}

/// DELETE /api/v1/templates/{id}
///
/// Templates are deactivated rather than deleted so message logs keep
/// their reference.
pub async fn deactivate_template(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !TemplateRepo::deactivate(&state.pool, id).await? {
        return Err(not_found(id));
    }
    tracing::info!(template_id = id, "Template deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/templates/{id}/stats
pub async fn template_stats(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    TemplateRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let stats = TemplateRepo::stats(&state.pool, id).await?;
    Ok(Json(stats))
}
