//! HTTP surface
//!
//! One POST endpoint does the real work; the rest are operational
//! read-outs (statistics, session inspection, health).

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod chat;
pub mod error;
pub mod health;
pub mod session;
pub mod state;
pub mod stats;

pub use error::ApiError;
pub use state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat::chat))
        .route("/stats/cache", get(stats::cache_stats))
        .route("/stats/providers", get(stats::provider_stats))
        .route("/stats/reconcile", get(stats::reconcile_stats))
        .route(
            "/session/{id}",
            get(session::get_session).delete(session::delete_session),
        )
        .route("/health", get(health::health))
        .route("/live", get(health::live))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
