use async_trait::async_trait;
use serde::Deserialize;

use super::http_client::HttpClientTrait;
use crate::domain::{CompletionRequest, CompletionResponse, DomainError, LlmProvider, ModelTier, Usage};

const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 500;

/// Anthropic API provider
#[derive(Debug)]
pub struct AnthropicProvider<C: HttpClientTrait> {
    client: C,
    api_key: String,
    base_url: String,
    fast_model: String,
    capable_model: String,
}

impl<C: HttpClientTrait> AnthropicProvider<C> {
    pub fn new(
        client: C,
        api_key: impl Into<String>,
        fast_model: impl Into<String>,
        capable_model: impl Into<String>,
    ) -> Self {
        Self::with_base_url(
            client,
            api_key,
            fast_model,
            capable_model,
            DEFAULT_ANTHROPIC_BASE_URL,
        )
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        fast_model: impl Into<String>,
        capable_model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            api_key: api_key.into(),
            base_url,
            fast_model: fast_model.into(),
            capable_model: capable_model.into(),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast_model,
            ModelTier::Capable => &self.capable_model,
        }
    }

    fn build_request(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model_for(request.tier),
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": [{"role": "user", "content": request.prompt}],
        });

        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        body
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", ANTHROPIC_VERSION),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<CompletionResponse, DomainError> {
        let response: AnthropicResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("anthropic", format!("Failed to parse response: {}", e))
        })?;

        let text = response
            .content
            .into_iter()
            .filter_map(|block| {
                if block.content_type == "text" {
                    block.text
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");

        Ok(CompletionResponse::new(text, response.model).with_usage(Usage::new(
            response.usage.input_tokens,
            response.usage.output_tokens,
        )))
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for AnthropicProvider<C> {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, DomainError> {
        let url = self.messages_url();
        let body = self.build_request(&request);
        let response = self.client.post_json(&url, self.headers(), &body).await?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}

// Anthropic API types

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;

    const TEST_URL: &str = "https://api.anthropic.com/v1/messages";

    fn provider(client: MockHttpClient) -> AnthropicProvider<MockHttpClient> {
        AnthropicProvider::new(client, "test-api-key", "claude-fast", "claude-capable")
    }

    #[tokio::test]
    async fn test_anthropic_complete() {
        let mock_response = serde_json::json!({
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "model": "claude-capable",
            "content": [{
                "type": "text",
                "text": "I hear you on the price."
            }],
            "stop_reason": "end_turn",
            "usage": {
                "input_tokens": 42,
                "output_tokens": 8
            }
        });

        let client = MockHttpClient::new().with_response(TEST_URL, mock_response);
        let request = CompletionRequest::builder()
            .prompt("Generate natural sales response.")
            .max_tokens(150)
            .build();

        let response = provider(client).complete(request).await.unwrap();

        assert_eq!(response.text, "I hear you on the price.");
        assert_eq!(response.model, "claude-capable");
        assert_eq!(response.usage.unwrap().input_tokens, 42);
    }

    #[tokio::test]
    async fn test_anthropic_tier_selects_model() {
        let client = MockHttpClient::new();
        let provider = provider(client);

        let fast = provider.build_request(
            &CompletionRequest::builder()
                .prompt("hi")
                .tier(ModelTier::Fast)
                .build(),
        );
        let capable = provider.build_request(
            &CompletionRequest::builder()
                .prompt("hi")
                .tier(ModelTier::Capable)
                .build(),
        );

        assert_eq!(fast["model"], "claude-fast");
        assert_eq!(capable["model"], "claude-capable");
    }

    #[tokio::test]
    async fn test_anthropic_error_propagates() {
        let client = MockHttpClient::new().with_error(TEST_URL, "connection refused");
        let request = CompletionRequest::new("hello");

        let result = provider(client).complete(request).await;

        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }
}
