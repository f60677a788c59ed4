//! Dependency wiring
//!
//! Builds the full object graph from configuration: transports, providers,
//! router, caches, services, orchestrator, and the shared HTTP state.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::api::AppState;
use crate::config::AppConfig;
use crate::domain::{
    DomainError, EmbeddingProvider, LlmProvider, RuleSet, SessionStore,
};
use crate::infrastructure::cache::{ExactMatchCache, SemanticCache};
use crate::infrastructure::llm::{
    AnthropicProvider, ConnectionPool, DisabledEmbeddingProvider, OpenAiEmbeddingProvider,
    OpenAiProvider,
};
use crate::infrastructure::router::ProviderRouter;
use crate::infrastructure::services::{
    CaptureService, GenerationService, Orchestrator, SituationService,
};

const ANTHROPIC_POOL_ID: &str = "anthropic";
const OPENAI_POOL_ID: &str = "openai";
const EMBEDDING_POOL_ID: &str = "embeddings";

/// Assemble the application state from configuration.
///
/// Fails when no completion provider has an API key; a missing embedding
/// key only degrades the semantic cache tier.
pub fn build_state(config: &AppConfig) -> Result<AppState, DomainError> {
    let rules = Arc::new(RuleSet::load_from_dir(&config.rules.dir)?);

    let pool = Arc::new(ConnectionPool::new(
        &config.pool_config(),
        &[ANTHROPIC_POOL_ID, OPENAI_POOL_ID, EMBEDDING_POOL_ID],
    )?);

    let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::new();

    if let Some(api_key) = config.llm.anthropic.api_key.as_deref() {
        let client = pool
            .client(ANTHROPIC_POOL_ID)
            .ok_or_else(|| DomainError::configuration("Missing anthropic transport"))?;
        providers.push(Arc::new(AnthropicProvider::new(
            client,
            api_key,
            &config.llm.anthropic.fast_model,
            &config.llm.anthropic.capable_model,
        )));
    }

    if let Some(api_key) = config.llm.openai.api_key.as_deref() {
        let client = pool
            .client(OPENAI_POOL_ID)
            .ok_or_else(|| DomainError::configuration("Missing openai transport"))?;
        providers.push(Arc::new(OpenAiProvider::new(
            client,
            api_key,
            &config.llm.openai.fast_model,
            &config.llm.openai.capable_model,
        )));
    }

    if providers.is_empty() {
        return Err(DomainError::configuration(
            "No LLM provider API keys configured",
        ));
    }

    info!(
        providers = ?providers.iter().map(|p| p.provider_name()).collect::<Vec<_>>(),
        "Providers configured"
    );

    let embedder: Arc<dyn EmbeddingProvider> = match config.llm.openai.api_key.as_deref() {
        Some(api_key) => {
            let client = pool
                .client(EMBEDDING_POOL_ID)
                .ok_or_else(|| DomainError::configuration("Missing embedding transport"))?;
            Arc::new(OpenAiEmbeddingProvider::new(
                client,
                api_key,
                &config.cache.embedding_model,
            ))
        }
        None => {
            warn!("No embedding key configured, semantic cache tier disabled");
            Arc::new(DisabledEmbeddingProvider)
        }
    };

    let router = Arc::new(ProviderRouter::new(
        providers,
        Duration::from_secs(config.llm.call_timeout_secs),
    ));

    let cache_ttl = Duration::from_secs(config.cache.ttl_secs);
    let exact_cache = Arc::new(ExactMatchCache::new(cache_ttl, config.cache.max_size));
    let semantic_cache = Arc::new(SemanticCache::new(
        embedder,
        config.cache.similarity_threshold,
        cache_ttl,
        config.cache.max_size,
    ));

    let retry = config.retry_policy();
    let thresholds = config.complexity_thresholds();

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(SessionStore::new()),
        exact_cache,
        semantic_cache,
        CaptureService::new(
            Arc::clone(&router),
            Arc::clone(&rules),
            retry.clone(),
            config.llm.extract_max_tokens,
            thresholds.clone(),
        ),
        SituationService::new(
            Arc::clone(&router),
            Arc::clone(&rules),
            retry.clone(),
            config.llm.classify_max_tokens,
            thresholds.clone(),
            config.classification_defaults(),
        ),
        GenerationService::new(
            Arc::clone(&router),
            retry,
            config.llm.generate_max_tokens,
            config.llm.generate_max_quotes,
            thresholds,
        ),
        rules,
        config.reconcile_config(),
    ));

    Ok(AppState::new(orchestrator, router, pool))
}
