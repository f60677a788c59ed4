use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::error::ApiError;
use super::state::AppState;
use crate::domain::Session;

/// GET /session/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    state
        .orchestrator
        .sessions()
        .snapshot(&session_id)
        .await
        .map(Json)
        .ok_or_else(|| {
            ApiError(crate::domain::DomainError::not_found(format!(
                "Session '{}' does not exist",
                session_id
            )))
        })
}

/// DELETE /session/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.orchestrator.sessions().clear(&session_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError(crate::domain::DomainError::not_found(format!(
            "Session '{}' does not exist",
            session_id
        ))))
    }
}
