//! Provider racing
//!
//! Every LLM task is dispatched to all configured providers at once. The
//! first successful completion wins and the losing in-flight calls are
//! aborted, so tail latency tracks the fastest healthy upstream instead of
//! the slowest.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::domain::{CompletionRequest, DomainError, LlmProvider, TaskSpec};

/// Result of one race: the winning completion plus timing
#[derive(Debug, Clone)]
pub struct RaceOutcome {
    pub provider: &'static str,
    pub text: String,
    pub model: String,
    pub latency_ms: u64,
    /// Providers still in flight when the winner landed
    pub cancelled: Vec<&'static str>,
}

/// Per-provider win/error counters
#[derive(Debug, Default)]
struct ProviderCounters {
    wins: AtomicU64,
    errors: AtomicU64,
}

/// Snapshot of one provider's counters
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProviderStats {
    pub wins: u64,
    pub errors: u64,
}

/// Races completions across providers and tracks per-provider outcomes
#[derive(Debug)]
pub struct ProviderRouter {
    providers: Vec<Arc<dyn LlmProvider>>,
    counters: HashMap<&'static str, ProviderCounters>,
    call_timeout: Duration,
}

impl ProviderRouter {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>, call_timeout: Duration) -> Self {
        let counters = providers
            .iter()
            .map(|p| (p.provider_name(), ProviderCounters::default()))
            .collect();

        Self {
            providers,
            counters,
            call_timeout,
        }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.provider_name()).collect()
    }

    pub fn providers(&self) -> &[Arc<dyn LlmProvider>] {
        &self.providers
    }

    /// Dispatch a task to every provider and return the first success.
    ///
    /// An individual provider failure never fails the race while another
    /// provider is still running. Each terminal failure increments that
    /// provider's error counter. Only when every provider has failed does
    /// the race itself fail.
    pub async fn execute(&self, spec: &TaskSpec) -> Result<RaceOutcome, DomainError> {
        if self.providers.is_empty() {
            return Err(DomainError::configuration("No providers configured"));
        }

        let request = self.build_request(spec);
        let started = Instant::now();

        // Single provider: call directly, nothing to race
        if self.providers.len() == 1 {
            let provider = &self.providers[0];
            let name = provider.provider_name();

            return match self.timed_call(provider, request).await {
                Ok(response) => {
                    self.record_win(name);
                    Ok(RaceOutcome {
                        provider: name,
                        text: response.text,
                        model: response.model,
                        latency_ms: started.elapsed().as_millis() as u64,
                        cancelled: Vec::new(),
                    })
                }
                Err(e) => {
                    self.record_error(name);
                    warn!(task = %spec.task, provider = name, error = %e, "Provider call failed");
                    Err(DomainError::all_providers_failed(spec.task.to_string()))
                }
            };
        }

        let mut race: JoinSet<(&'static str, Result<_, DomainError>)> = JoinSet::new();

        for provider in &self.providers {
            let provider = Arc::clone(provider);
            let request = request.clone();
            let timeout = self.call_timeout;

            race.spawn(async move {
                let name = provider.provider_name();
                let result = match tokio::time::timeout(timeout, provider.complete(request)).await {
                    Ok(inner) => inner,
                    Err(_) => Err(DomainError::timeout(name)),
                };
                (name, result)
            });
        }

        let mut failed: Vec<&'static str> = Vec::new();

        while let Some(joined) = race.join_next().await {
            let (name, result) = match joined {
                Ok(pair) => pair,
                // Join errors only come from aborted losers
                Err(_) => continue,
            };

            match result {
                Ok(response) => {
                    self.record_win(name);
                    race.abort_all();

                    // Everyone who neither won nor already failed was
                    // still in flight and got cancelled
                    let cancelled: Vec<&'static str> = self
                        .provider_names()
                        .into_iter()
                        .filter(|p| *p != name && !failed.contains(p))
                        .collect();

                    debug!(
                        task = %spec.task,
                        winner = name,
                        cancelled = ?cancelled,
                        latency_ms = started.elapsed().as_millis() as u64,
                        "Race won"
                    );

                    return Ok(RaceOutcome {
                        provider: name,
                        text: response.text,
                        model: response.model,
                        latency_ms: started.elapsed().as_millis() as u64,
                        cancelled,
                    });
                }
                Err(e) => {
                    self.record_error(name);
                    failed.push(name);
                    warn!(task = %spec.task, provider = name, error = %e, "Provider lost race with error");
                }
            }
        }

        Err(DomainError::all_providers_failed(spec.task.to_string()))
    }

    fn build_request(&self, spec: &TaskSpec) -> CompletionRequest {
        CompletionRequest::builder()
            .prompt(spec.prompt.clone())
            .tier(spec.complexity.tier())
            .max_tokens(spec.max_tokens)
            .build()
    }

    async fn timed_call(
        &self,
        provider: &Arc<dyn LlmProvider>,
        request: CompletionRequest,
    ) -> Result<crate::domain::CompletionResponse, DomainError> {
        match tokio::time::timeout(self.call_timeout, provider.complete(request)).await {
            Ok(inner) => inner,
            Err(_) => Err(DomainError::timeout(provider.provider_name())),
        }
    }

    fn record_win(&self, name: &'static str) {
        if let Some(c) = self.counters.get(name) {
            c.wins.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_error(&self, name: &'static str) {
        if let Some(c) = self.counters.get(name) {
            c.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn provider_stats(&self) -> HashMap<String, ProviderStats> {
        self.counters
            .iter()
            .map(|(name, c)| {
                (
                    name.to_string(),
                    ProviderStats {
                        wins: c.wins.load(Ordering::Relaxed),
                        errors: c.errors.load(Ordering::Relaxed),
                    },
                )
            })
            .collect()
    }

    pub fn reset_stats(&self) {
        for c in self.counters.values() {
            c.wins.store(0, Ordering::Relaxed);
            c.errors.store(0, Ordering::Relaxed);
        }
    }
}
