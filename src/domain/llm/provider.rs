use async_trait::async_trait;
use std::fmt::Debug;

use super::{CompletionRequest, CompletionResponse};
use crate::domain::DomainError;

/// Trait for LLM providers (Anthropic, OpenAI, etc.)
///
/// A provider owns its model tier mapping: the router only says whether a
/// call should use the fast or the capable variant.
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Send a completion request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::task::ModelTier;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scriptable provider for router and orchestrator tests
    #[derive(Debug)]
    pub struct MockLlmProvider {
        name: &'static str,
        response: Option<String>,
        error: Option<String>,
        delay: Option<Duration>,
        calls: AtomicU64,
        seen_tiers: Mutex<Vec<ModelTier>>,
    }

    impl MockLlmProvider {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                response: None,
                error: None,
                delay: None,
                calls: AtomicU64::new(0),
                seen_tiers: Mutex::new(Vec::new()),
            }
        }

        pub fn with_response(mut self, response: impl Into<String>) -> Self {
            self.response = Some(response.into());
            self
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        /// Delay before completing, to script race outcomes
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn call_count(&self) -> u64 {
            self.calls.load(Ordering::Relaxed)
        }

        pub fn seen_tiers(&self) -> Vec<ModelTier> {
            self.seen_tiers.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlmProvider {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, DomainError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.seen_tiers.lock().unwrap().push(request.tier);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(ref error) = self.error {
                return Err(DomainError::provider(self.name, error));
            }

            self.response
                .clone()
                .map(|text| CompletionResponse::new(text, "mock-model"))
                .ok_or_else(|| DomainError::provider(self.name, "No mock response configured"))
        }

        fn provider_name(&self) -> &'static str {
            self.name
        }
    }
}
