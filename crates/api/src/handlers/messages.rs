use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use outreach_db::repositories::MessageLogRepo;

use crate::error::AppResult;
use crate::query::MessageListParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/messages?prospect_id=&campaign_id=&limit=&offset=
pub async fn list_messages(
    State(state): State<AppState>,
    Query(params): Query<MessageListParams>,
) -> AppResult<impl IntoResponse> {
    let messages = MessageLogRepo::list(
        &state.pool,
        params.prospect_id,
        params.campaign_id,
        outreach_db::clamp_limit(params.limit),
        outreach_db::clamp_offset(params.offset),
    )
    .await?;
    Ok(Json(DataResponse { data: messages }))
}
