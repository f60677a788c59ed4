//! Application configuration
//!
//! Layered: `config/default.toml` first, then `APP__`-prefixed environment
//! variables (e.g. `APP__SERVER__PORT=9090`). Every field has a default so
//! the engine starts with nothing but provider API keys set.

use std::time::Duration;

use serde::Deserialize;

use crate::domain::{ComplexityThresholds, DomainError};
use crate::infrastructure::llm::PoolConfig;
use crate::infrastructure::retry::RetryPolicy;
use crate::infrastructure::services::{ClassificationDefaults, ReconcileConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Directory holding the four rule table JSON files
    pub dir: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            dir: "config".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_size: usize,
    pub similarity_threshold: f32,
    pub embedding_model: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            max_size: 1000,
            similarity_threshold: 0.92,
            embedding_model: "text-embedding-3-small".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 1,
            max_delay_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider is disabled when no key is configured
    pub api_key: Option<String>,
    pub fast_model: String,
    pub capable_model: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub call_timeout_secs: u64,
    pub extract_max_tokens: u32,
    pub classify_max_tokens: u32,
    pub generate_max_tokens: u32,
    /// Most recent captured quotes passed to the generation prompt
    pub generate_max_quotes: usize,
    pub pool_max_idle_per_host: usize,
    pub pool_keepalive_secs: u64,
    pub anthropic: ProviderConfig,
    pub openai: ProviderConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 30,
            extract_max_tokens: 500,
            classify_max_tokens: 200,
            generate_max_tokens: 150,
            generate_max_quotes: 5,
            pool_max_idle_per_host: 10,
            pool_keepalive_secs: 60,
            anthropic: ProviderConfig {
                api_key: None,
                fast_model: "claude-3-5-haiku-latest".to_string(),
                capable_model: "claude-sonnet-4-0".to_string(),
            },
            openai: ProviderConfig {
                api_key: None,
                fast_model: "gpt-4o-mini".to_string(),
                capable_model: "gpt-4o".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    pub confidence_threshold: f32,
    pub max_new_slots: usize,
    pub max_new_quotes: usize,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            max_new_slots: 3,
            max_new_quotes: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ComplexityConfig {
    pub word_count_simple: usize,
    pub word_count_complex: usize,
    pub context_richness_simple: usize,
    pub context_richness_complex: usize,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        let defaults = ComplexityThresholds::default();
        Self {
            word_count_simple: defaults.word_count_simple,
            word_count_complex: defaults.word_count_complex,
            context_richness_simple: defaults.context_richness_simple,
            context_richness_complex: defaults.context_richness_complex,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub situation: String,
    pub confidence: f32,
    pub stage: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            situation: "just_browsing".to_string(),
            confidence: 0.3,
            stage: "discovery".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub rules: RulesConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub llm: LlmConfig,
    pub reconcile: ReconcileSettings,
    pub complexity: ComplexityConfig,
    pub defaults: DefaultsConfig,
}

impl AppConfig {
    /// Load from `config/default.toml` plus `APP__`-prefixed environment
    pub fn load() -> Result<Self, DomainError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to load config: {}", e)))?;

        config
            .try_deserialize()
            .map_err(|e| DomainError::configuration(format!("Invalid configuration: {}", e)))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_secs(self.retry.base_delay_secs),
            max_delay: Duration::from_secs(self.retry.max_delay_secs),
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_idle_per_host: self.llm.pool_max_idle_per_host,
            keepalive: Duration::from_secs(self.llm.pool_keepalive_secs),
            request_timeout: Duration::from_secs(self.llm.call_timeout_secs),
        }
    }

    pub fn complexity_thresholds(&self) -> ComplexityThresholds {
        ComplexityThresholds {
            word_count_simple: self.complexity.word_count_simple,
            word_count_complex: self.complexity.word_count_complex,
            context_richness_simple: self.complexity.context_richness_simple,
            context_richness_complex: self.complexity.context_richness_complex,
        }
    }

    pub fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            confidence_threshold: self.reconcile.confidence_threshold,
            max_new_slots: self.reconcile.max_new_slots,
            max_new_quotes: self.reconcile.max_new_quotes,
        }
    }

    pub fn classification_defaults(&self) -> ClassificationDefaults {
        ClassificationDefaults {
            situation: self.defaults.situation.clone(),
            confidence: self.defaults.confidence,
            stage: self.defaults.stage.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_complete() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.cache.max_size, 1000);
        assert!((config.cache.similarity_threshold - 0.92).abs() < 1e-6);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.llm.generate_max_quotes, 5);
        assert!(config.llm.anthropic.api_key.is_none());
    }

    #[test]
    fn test_retry_policy_conversion() {
        let policy = AppConfig::default().retry_policy();

        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(10));
    }

    #[test]
    fn test_reconcile_config_conversion() {
        let reconcile = AppConfig::default().reconcile_config();

        assert!((reconcile.confidence_threshold - 0.7).abs() < 1e-6);
        assert_eq!(reconcile.max_new_slots, 3);
        assert_eq!(reconcile.max_new_quotes, 1);
    }
}
