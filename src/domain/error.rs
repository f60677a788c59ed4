use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Provider timed out: {provider}")]
    Timeout { provider: String },

    #[error("All providers failed for task: {task}")]
    AllProvidersFailed { task: String },

    #[error("Embedding unavailable: {message}")]
    EmbeddingUnavailable { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn timeout(provider: impl Into<String>) -> Self {
        Self::Timeout {
            provider: provider.into(),
        }
    }

    pub fn all_providers_failed(task: impl Into<String>) -> Self {
        Self::AllProvidersFailed { task: task.into() }
    }

    pub fn embedding_unavailable(message: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error is worth retrying with backoff.
    ///
    /// Network-level provider failures and timeouts are transient; a race
    /// where every provider failed may still succeed on a fresh attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Provider { .. } | Self::Timeout { .. } | Self::AllProvidersFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let error = DomainError::provider("anthropic", "connection reset");
        assert_eq!(
            error.to_string(),
            "Provider error: anthropic - connection reset"
        );
    }

    #[test]
    fn test_all_providers_failed_display() {
        let error = DomainError::all_providers_failed("generate");
        assert_eq!(error.to_string(), "All providers failed for task: generate");
    }

    #[test]
    fn test_transient_classification() {
        assert!(DomainError::provider("openai", "503").is_transient());
        assert!(DomainError::timeout("anthropic").is_transient());
        assert!(DomainError::all_providers_failed("classify").is_transient());
        assert!(!DomainError::validation("empty message").is_transient());
        assert!(!DomainError::embedding_unavailable("no key").is_transient());
        assert!(!DomainError::configuration("missing key").is_transient());
    }
}
