//! Handlers for campaign A/B tests.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use outreach_core::error::CoreError;
use outreach_core::types::DbId;
use outreach_core::validation::{normalize_name, validate_ab_variants};
use outreach_db::models::ab_test::{CreateAbTest, VariantReport};
use outreach_db::repositories::AbTestRepo;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::handlers::campaigns::{find_campaign, require_active_template};
use crate::state::AppState;

/// POST /api/v1/campaigns/{id}/ab-tests
///
/// Every variant template must be active. The sequence worker picks a
/// variant uniformly at random for each message.
pub async fn create_ab_test(
    State(state): State<AppState>,
    Path(campaign_id): Path<DbId>,
    Json(input): Json<CreateAbTest>,
) -> AppResult<impl IntoResponse> {
    let name = normalize_name("name", &input.name)?;
    validate_ab_variants(&input.variants)?;
    find_campaign(&state, campaign_id).await?;
    for variant in &input.variants {
        require_active_template(&state, variant.template_id).await?;
    }

    let test = AbTestRepo::create(&state.pool, campaign_id, &name, &input.variants).await?;

    tracing::info!(
        ab_test_id = test.id,
        campaign_id,
        variants = input.variants.len(),
        "A/B test created",
    );
    Ok((StatusCode::CREATED, Json(test)))
}

/// GET /api/v1/ab-tests/{id}/results
pub async fn ab_test_results(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let test = AbTestRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "AbTest", id }))?;
    let variants: Vec<VariantReport> = AbTestRepo::results(&state.pool, id)
        .await?
        .iter()
        .map(VariantReport::from)
        .collect();

    Ok(Json(json!({
        "ab_test_id": test.id,
        "campaign_id": test.campaign_id,
        "name": test.name,
        "is_active": test.is_active,
        "variants": variants,
    })))
}
