use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use crate::domain::prompt::extraction_prompt;
use crate::domain::{
    estimate_complexity, ComplexityThresholds, DomainError, ExtractionResult, RuleSet, TaskKind,
    TaskSpec,
};
use crate::infrastructure::retry::{retry_with_backoff, RetryPolicy};
use crate::infrastructure::router::ProviderRouter;

/// Slot and quote extraction over the provider router.
///
/// Transport failures retry and then fail the request. Unparseable output
/// from a healthy provider degrades to an empty extraction instead: the
/// session keeps its accumulated context and the turn still gets a reply.
#[derive(Debug)]
pub struct CaptureService {
    router: Arc<ProviderRouter>,
    rules: Arc<RuleSet>,
    retry: RetryPolicy,
    max_tokens: u32,
    thresholds: ComplexityThresholds,
}

impl CaptureService {
    pub fn new(
        router: Arc<ProviderRouter>,
        rules: Arc<RuleSet>,
        retry: RetryPolicy,
        max_tokens: u32,
        thresholds: ComplexityThresholds,
    ) -> Self {
        Self {
            router,
            rules,
            retry,
            max_tokens,
            thresholds,
        }
    }

    pub async fn extract(
        &self,
        message: &str,
        context: &BTreeMap<String, String>,
    ) -> Result<ExtractionResult, DomainError> {
        let prompt = extraction_prompt(message, context, &self.rules.slot_names());
        let complexity = estimate_complexity(message, context, TaskKind::Extract, &self.thresholds);
        let spec =
            TaskSpec::new(TaskKind::Extract, prompt, self.max_tokens).with_complexity(complexity);

        let outcome =
            retry_with_backoff(&self.retry, "extract", || self.router.execute(&spec)).await?;

        Ok(ExtractionResult::parse(&outcome.text).unwrap_or_else(|| {
            warn!(
                provider = outcome.provider,
                "Unparseable extraction output, continuing with empty result"
            );
            ExtractionResult::default()
        }))
    }
}
