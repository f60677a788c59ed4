use std::sync::Arc;

use crate::infrastructure::llm::ConnectionPool;
use crate::infrastructure::router::ProviderRouter;
use crate::infrastructure::services::Orchestrator;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub router: Arc<ProviderRouter>,
    pub pool: Arc<ConnectionPool>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        router: Arc<ProviderRouter>,
        pool: Arc<ConnectionPool>,
    ) -> Self {
        Self {
            orchestrator,
            router,
            pool,
        }
    }
}
