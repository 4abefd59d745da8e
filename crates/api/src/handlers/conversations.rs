//! Handlers for the in-memory conversation flow.
//!
//! Conversations live in the API process only and are lost on restart.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use outreach_core::conversation::{ConversationState, ResponseData};
use outreach_core::error::CoreError;
use outreach_core::message::MessageType;
use outreach_core::types::DbId;
use outreach_db::repositories::ProspectRepo;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartConversation {
    pub prospect_id: DbId,
    pub campaign_id: Option<DbId>,
    /// Message type the conversation runs on (default `email`).
    pub channel: Option<String>,
    pub initial_message: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateConversationState {
    pub state: ConversationState,
    pub response: Option<ResponseData>,
}

/// POST /api/v1/conversations
pub async fn start_conversation(
    State(state): State<AppState>,
    Json(input): Json<StartConversation>,
) -> AppResult<impl IntoResponse> {
    let channel: MessageType = input.channel.as_deref().unwrap_or("email").parse()?;
    if input.initial_message.trim().is_empty() {
        return Err(AppError::Core(CoreError::validation("initial_message must not be empty")));
    }
    ProspectRepo::find_by_id(&state.pool, input.prospect_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Prospect",
            id: input.prospect_id,
        }))?;

    let status = state
        .conversations
        .lock()
        .await
        .start(
            input.prospect_id,
            input.campaign_id,
            channel.as_str(),
            input.initial_message,
            Utc::now(),
        )
        .status();

    tracing::info!(
        conversation_id = %status.id,
        prospect_id = input.prospect_id,
        channel = %channel,
        "Conversation started",
    );
    Ok((StatusCode::CREATED, Json(status)))
}

/// GET /api/v1/conversations/{id}
pub async fn conversation_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let status = state
        .conversations
        .lock()
        .await
        .status(id)
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFoundByKey {
                entity: "Conversation",
                key: id.to_string(),
            })
        })?;
    Ok(Json(status))
}

/// PUT /api/v1/conversations/{id}/state
///
/// Invalid transitions return 400; closed conversations return 409.
pub async fn update_conversation_state(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateConversationState>,
) -> AppResult<impl IntoResponse> {
    let status = state
        .conversations
        .lock()
        .await
        .update_state(id, input.state, input.response, Utc::now())?;

    tracing::info!(conversation_id = %id, state = %status.state, "Conversation state updated");
    Ok(Json(status))
}
