use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::error::ApiError;
use super::state::AppState;
use crate::domain::AgentReply;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Generated when absent, so a caller can open a conversation without
    /// minting an id first
    pub session_id: Option<String>,
    pub message: String,
    pub product_context: Option<String>,
}

/// POST /chat
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<AgentReply>, ApiError> {
    let session_id = request
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let reply = state
        .orchestrator
        .handle_message(
            &session_id,
            &request.message,
            request.product_context.as_deref(),
        )
        .await?;

    Ok(Json(reply))
}
