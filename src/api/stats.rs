use std::collections::HashMap;

use axum::extract::State;
use axum::Json;

use super::state::AppState;
use crate::infrastructure::cache::CacheStats;
use crate::infrastructure::router::ProviderStats;
use crate::infrastructure::services::ReconcileStats;

/// GET /stats/cache
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.orchestrator.cache_stats().await)
}

/// GET /stats/providers
pub async fn provider_stats(State(state): State<AppState>) -> Json<HashMap<String, ProviderStats>> {
    Json(state.router.provider_stats())
}

/// GET /stats/reconcile
pub async fn reconcile_stats(State(state): State<AppState>) -> Json<ReconcileStats> {
    Json(state.orchestrator.reconcile_stats())
}
