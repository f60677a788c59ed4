use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Whether the connection pool finished its warm-up pass
    pub pool_ready: bool,
    pub providers: Vec<&'static str>,
    pub timestamp: DateTime<Utc>,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        pool_ready: state.pool.is_ready(),
        providers: state.router.provider_names(),
        timestamp: Utc::now(),
    })
}

/// GET /live
pub async fn live() -> &'static str {
    "OK"
}
