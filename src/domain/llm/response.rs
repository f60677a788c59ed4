use serde::{Deserialize, Serialize};

/// Token usage statistics reported by a provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }
}

/// Completed LLM response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text
    pub text: String,
    /// Concrete model that answered
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl CompletionResponse {
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_with_usage() {
        let response =
            CompletionResponse::new("Sure, happy to help.", "fast-1").with_usage(Usage::new(12, 6));

        assert_eq!(response.text, "Sure, happy to help.");
        assert_eq!(response.model, "fast-1");
        assert_eq!(response.usage.unwrap().output_tokens, 6);
    }
}
