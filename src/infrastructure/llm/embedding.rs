use async_trait::async_trait;
use serde::Deserialize;

use super::http_client::HttpClientTrait;
use crate::domain::{DomainError, EmbeddingProvider};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// OpenAI embeddings provider, used by the semantic cache
#[derive(Debug)]
pub struct OpenAiEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    api_key: String,
    base_url: String,
    model: String,
}

impl<C: HttpClientTrait> OpenAiEmbeddingProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, model, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            api_key: api_key.into(),
            base_url,
            model: model.into(),
        }
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for OpenAiEmbeddingProvider<C> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let url = self.embeddings_url();
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        let auth = format!("Bearer {}", self.api_key);
        let headers = vec![
            ("Authorization", auth.as_str()),
            ("Content-Type", "application/json"),
        ];

        // Transport failures become EmbeddingUnavailable so callers can
        // degrade the semantic tier instead of failing the request
        let response = self
            .client
            .post_json(&url, headers, &body)
            .await
            .map_err(|e| DomainError::embedding_unavailable(e.to_string()))?;

        let parsed: EmbeddingsResponse = serde_json::from_value(response).map_err(|e| {
            DomainError::embedding_unavailable(format!("Failed to parse response: {}", e))
        })?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| DomainError::embedding_unavailable("Response contained no embeddings"))
    }

    fn provider_name(&self) -> &'static str {
        "openai-embeddings"
    }
}

/// Stand-in used when no embedding key is configured.
///
/// Always reports unavailable, so the semantic tier runs permanently
/// degraded (every lookup misses, every insert is skipped) while the rest
/// of the engine works normally.
#[derive(Debug)]
pub struct DisabledEmbeddingProvider;

#[async_trait]
impl EmbeddingProvider for DisabledEmbeddingProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, DomainError> {
        Err(DomainError::embedding_unavailable(
            "No embedding provider configured",
        ))
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}
