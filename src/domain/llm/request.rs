use serde::{Deserialize, Serialize};

use crate::domain::task::ModelTier;

/// Parameters for an LLM completion call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Fully rendered prompt text
    pub prompt: String,
    /// Which model variant the provider should answer with
    pub tier: ModelTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            tier: ModelTier::Capable,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn builder() -> CompletionRequestBuilder {
        CompletionRequestBuilder::default()
    }
}

/// Builder for CompletionRequest
#[derive(Debug, Default)]
pub struct CompletionRequestBuilder {
    prompt: String,
    tier: Option<ModelTier>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl CompletionRequestBuilder {
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn tier(mut self, tier: ModelTier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn build(self) -> CompletionRequest {
        CompletionRequest {
            prompt: self.prompt,
            tier: self.tier.unwrap_or(ModelTier::Capable),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}
