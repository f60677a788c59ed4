use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use crate::domain::prompt::generation_prompt;
use crate::domain::{
    estimate_complexity, ComplexityThresholds, Principle, TaskKind, TaskSpec,
};
use crate::infrastructure::retry::{retry_with_backoff, RetryPolicy};
use crate::infrastructure::router::ProviderRouter;

/// Responses are capped at this many sentences
const MAX_SENTENCES: usize = 2;

/// Outcome of response generation
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub text: String,
    /// Winning provider, absent when the canned fallback was used
    pub provider: Option<String>,
    pub fell_back: bool,
}

/// Final response generation over the provider router.
///
/// Generation never hard-fails a request: when every provider is down even
/// after retries, a deterministic template built from the captured quotes
/// keeps the conversation moving.
#[derive(Debug)]
pub struct GenerationService {
    router: Arc<ProviderRouter>,
    retry: RetryPolicy,
    max_tokens: u32,
    /// Only this many of the most recent quotes feed the prompt
    max_quotes: usize,
    thresholds: ComplexityThresholds,
}

impl GenerationService {
    pub fn new(
        router: Arc<ProviderRouter>,
        retry: RetryPolicy,
        max_tokens: u32,
        max_quotes: usize,
        thresholds: ComplexityThresholds,
    ) -> Self {
        Self {
            router,
            retry,
            max_tokens,
            max_quotes,
            thresholds,
        }
    }

    pub async fn generate(
        &self,
        message: &str,
        principle: &Principle,
        quotes: &[String],
        situation: &str,
        context: &BTreeMap<String, String>,
        product_context: Option<&str>,
    ) -> GenerationOutcome {
        let recent_quotes: Vec<String> = quotes
            .iter()
            .rev()
            .take(self.max_quotes)
            .rev()
            .cloned()
            .collect();

        let prompt =
            generation_prompt(principle, &recent_quotes, situation, context, product_context);
        let complexity =
            estimate_complexity(message, context, TaskKind::Generate, &self.thresholds);
        let spec =
            TaskSpec::new(TaskKind::Generate, prompt, self.max_tokens).with_complexity(complexity);

        match retry_with_backoff(&self.retry, "generate", || self.router.execute(&spec)).await {
            Ok(outcome) => GenerationOutcome {
                text: cap_sentences(outcome.text.trim(), MAX_SENTENCES),
                provider: Some(outcome.provider.to_string()),
                fell_back: false,
            },
            Err(e) => {
                warn!(error = %e, "Generation failed, using fallback template");
                GenerationOutcome {
                    text: fallback_response(quotes),
                    provider: None,
                    fell_back: true,
                }
            }
        }
    }
}

/// Deterministic reply used when no provider can generate
fn fallback_response(quotes: &[String]) -> String {
    match quotes.last() {
        Some(quote) => format!(
            "I understand you mentioned '{}'. Can you tell me more about what you're looking for?",
            quote
        ),
        None => "I'd like to help you find the right product. What brings you in today?".to_string(),
    }
}

/// Truncate to the first `max` sentences, keeping terminal punctuation
fn cap_sentences(text: &str, max: usize) -> String {
    let mut count = 0;
    let mut end = text.len();

    for (i, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            count += 1;
            if count == max {
                end = i + c.len_utf8();
                break;
            }
        }
    }

    text[..end].trim().to_string()
}
