//! Shared connection pool for upstream providers
//!
//! One keep-alive, multiplexed transport per provider, created once at
//! startup and handed out as long-lived shared handles. A warm-up pass
//! establishes connections before the first real request so it does not pay
//! the TLS/TCP setup cost.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::http_client::HttpClient;
use crate::domain::{CompletionRequest, DomainError, LlmProvider, ModelTier};

/// Transport settings for pooled provider connections
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_idle_per_host: usize,
    pub keepalive: Duration,
    pub request_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 10,
            keepalive: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Process-wide pool of provider transports
#[derive(Debug)]
pub struct ConnectionPool {
    clients: HashMap<String, HttpClient>,
    ready: AtomicBool,
}

impl ConnectionPool {
    /// Build one pooled transport per provider id
    pub fn new(config: &PoolConfig, provider_ids: &[&str]) -> Result<Self, DomainError> {
        let mut clients = HashMap::new();

        for id in provider_ids {
            let transport = reqwest::Client::builder()
                .pool_max_idle_per_host(config.max_idle_per_host)
                .tcp_keepalive(config.keepalive)
                .timeout(config.request_timeout)
                .build()
                .map_err(|e| {
                    DomainError::configuration(format!(
                        "Failed to build transport for {}: {}",
                        id, e
                    ))
                })?;

            clients.insert(id.to_string(), HttpClient::with_client(transport));
        }

        Ok(Self {
            clients,
            ready: AtomicBool::new(false),
        })
    }

    /// Get the shared transport handle for a provider
    pub fn client(&self, provider_id: &str) -> Option<HttpClient> {
        self.clients.get(provider_id).cloned()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    /// Establish connections with one minimal completion per provider.
    ///
    /// Best effort: a provider that fails warm-up still participates in
    /// racing, it just pays connection setup on its first real call.
    pub async fn warmup(&self, providers: &[Arc<dyn LlmProvider>]) {
        let warmups = providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            async move {
                let request = CompletionRequest::builder()
                    .prompt("Hi")
                    .tier(ModelTier::Fast)
                    .max_tokens(1)
                    .build();

                match provider.complete(request).await {
                    Ok(_) => debug!(provider = provider.provider_name(), "Warm-up completed"),
                    Err(e) => warn!(
                        provider = provider.provider_name(),
                        error = %e,
                        "Warm-up failed (non-critical)"
                    ),
                }
            }
        });

        join_all(warmups).await;
        self.ready.store(true, Ordering::Relaxed);
        info!("Connection pool warm-up finished");
    }
}
