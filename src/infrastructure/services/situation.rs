use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use crate::domain::prompt::classification_prompt;
use crate::domain::{
    estimate_complexity, ClassificationResult, ComplexityThresholds, DomainError, RuleSet,
    TaskKind, TaskSpec,
};
use crate::infrastructure::retry::{retry_with_backoff, RetryPolicy};
use crate::infrastructure::router::ProviderRouter;

/// Defaults applied when classification output is unusable
#[derive(Debug, Clone)]
pub struct ClassificationDefaults {
    pub situation: String,
    pub confidence: f32,
    pub stage: String,
}

impl Default for ClassificationDefaults {
    fn default() -> Self {
        Self {
            situation: "just_browsing".to_string(),
            confidence: 0.3,
            stage: "discovery".to_string(),
        }
    }
}

/// Situation classification over the provider router.
///
/// Same degradation contract as capture: transport failures are hard
/// errors, unusable output from a healthy provider falls back to the
/// configured default situation at low confidence.
#[derive(Debug)]
pub struct SituationService {
    router: Arc<ProviderRouter>,
    rules: Arc<RuleSet>,
    retry: RetryPolicy,
    max_tokens: u32,
    thresholds: ComplexityThresholds,
    defaults: ClassificationDefaults,
}

impl SituationService {
    pub fn new(
        router: Arc<ProviderRouter>,
        rules: Arc<RuleSet>,
        retry: RetryPolicy,
        max_tokens: u32,
        thresholds: ComplexityThresholds,
        defaults: ClassificationDefaults,
    ) -> Self {
        Self {
            router,
            rules,
            retry,
            max_tokens,
            thresholds,
            defaults,
        }
    }

    pub async fn classify(
        &self,
        message: &str,
        context: &BTreeMap<String, String>,
    ) -> Result<ClassificationResult, DomainError> {
        let prompt = classification_prompt(message, context, &self.rules.situation_keys());
        let complexity =
            estimate_complexity(message, context, TaskKind::Classify, &self.thresholds);
        let spec =
            TaskSpec::new(TaskKind::Classify, prompt, self.max_tokens).with_complexity(complexity);

        let outcome =
            retry_with_backoff(&self.retry, "classify", || self.router.execute(&spec)).await?;

        let result = match ClassificationResult::parse(&outcome.text) {
            Some(result) if self.rules.has_situation(&result.situation) => result,
            Some(result) => {
                warn!(
                    situation = %result.situation,
                    "Classifier returned unknown situation, using default"
                );
                self.default_result()
            }
            None => {
                warn!(
                    provider = outcome.provider,
                    "Unparseable classification output, using default"
                );
                self.default_result()
            }
        };

        Ok(result)
    }

    fn default_result(&self) -> ClassificationResult {
        ClassificationResult {
            situation: self.defaults.situation.clone(),
            confidence: self.defaults.confidence,
            stage: self.defaults.stage.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockLlmProvider;
    use crate::domain::rules::fixtures;
    use crate::domain::LlmProvider;
    use std::time::Duration;

    fn service(provider: MockLlmProvider) -> SituationService {
        let provider: Arc<dyn LlmProvider> = Arc::new(provider);
        let router = Arc::new(ProviderRouter::new(vec![provider], Duration::from_secs(5)));
        let retry = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };

        SituationService::new(
            router,
            Arc::new(fixtures::rule_set()),
            retry,
            200,
            ComplexityThresholds::default(),
            ClassificationDefaults::default(),
        )
    }

    #[tokio::test]
    async fn test_classify_parses_situation() {
        let service = service(MockLlmProvider::new("anthropic").with_response(
            r#"{"situation": "price_shock_in_store", "confidence": 0.88, "stage": "objection_handling"}"#,
        ));

        let result = service
            .classify("that is way too expensive", &BTreeMap::new())
            .await
            .unwrap();

        assert_eq!(result.situation, "price_shock_in_store");
        assert!((result.confidence - 0.88).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_unknown_situation_uses_default() {
        let service = service(MockLlmProvider::new("anthropic").with_response(
            r#"{"situation": "made_up_situation", "confidence": 0.95}"#,
        ));

        let result = service.classify("hello", &BTreeMap::new()).await.unwrap();

        assert_eq!(result.situation, "just_browsing");
        assert!((result.confidence - 0.3).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_garbage_output_uses_default() {
        let service = service(MockLlmProvider::new("anthropic").with_response("no json here"));

        let result = service.classify("hello", &BTreeMap::new()).await.unwrap();

        assert_eq!(result.situation, "just_browsing");
        assert_eq!(result.stage, "discovery");
    }

    #[tokio::test]
    async fn test_provider_failure_is_hard_error() {
        let service = service(MockLlmProvider::new("anthropic").with_error("down"));

        let result = service.classify("hello", &BTreeMap::new()).await;

        assert!(matches!(
            result,
            Err(DomainError::AllProvidersFailed { .. })
        ));
    }
}
