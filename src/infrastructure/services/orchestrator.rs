//! Request orchestration
//!
//! One entry point per customer message. The fast path answers from the
//! two-tier cache; the slow path runs extraction and classification in
//! parallel, reconciles when the two passes disagree enough to matter,
//! selects a persuasion principle, generates the reply, and finally writes
//! both cache tiers keyed by the context as it was before extraction.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    AgentReply, CacheTier, ClassificationResult, Diagnostics, DomainError, RuleSet, Session,
    StepLatencies,
};
use crate::infrastructure::cache::{
    cache_key, context_hash, CacheStats, ExactMatchCache, SemanticCache,
};

use super::capture::CaptureService;
use super::generation::GenerationService;
use super::situation::SituationService;

/// Phrases that read as pushback and escalate the fallback ladder
const RESISTANCE_SIGNALS: &[&str] = &[
    "not interested",
    "just looking",
    "too pushy",
    "leave me alone",
    "no thanks",
    "i'll think about it",
    "maybe later",
    "stop",
];

/// Phrases that read as engagement and reset the ladder
const POSITIVE_SIGNALS: &[&str] = &[
    "tell me more",
    "sounds good",
    "that helps",
    "makes sense",
    "good point",
    "okay sure",
    "interesting",
];

/// Captured emotional states that count as pushback
const NEGATIVE_EMOTIONS: &[&str] = &["worried", "anxious", "skeptical", "frustrated", "confused"];

/// Captured emotional states that count as engagement
const POSITIVE_EMOTIONS: &[&str] = &["excited", "happy", "hopeful"];

/// Situations that are themselves resistance, whatever the wording
const RESISTANCE_SITUATIONS: &[&str] =
    &["price_shock_in_store", "walking_away_pause", "budget_boundary"];

/// Situations that signal buying intent
const POSITIVE_SITUATIONS: &[&str] = &["second_visit_return"];

/// Thresholds deciding when classification is re-run after extraction
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Classifications below this confidence are re-run
    pub confidence_threshold: f32,
    /// More new slots than this in one turn forces a re-run
    pub max_new_slots: usize,
    /// More new quotes than this in one turn forces a re-run
    pub max_new_quotes: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            max_new_slots: 3,
            max_new_quotes: 1,
        }
    }
}

#[derive(Debug, Default)]
struct ReconcileCounters {
    checked: AtomicU64,
    triggered: AtomicU64,
    low_confidence: AtomicU64,
    new_critical_slot: AtomicU64,
    many_new_slots: AtomicU64,
    many_new_quotes: AtomicU64,
}

/// Snapshot of reconcile activity since startup
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReconcileStats {
    pub checked: u64,
    pub triggered: u64,
    /// Triggered fraction of checked turns
    pub rate: f32,
    pub low_confidence: u64,
    pub new_critical_slot: u64,
    pub many_new_slots: u64,
    pub many_new_quotes: u64,
}

/// Why a reconcile pass ran, for logs and counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReconcileReason {
    LowConfidence,
    NewCriticalSlot,
    ManyNewSlots,
    ManyNewQuotes,
}

use crate::domain::SessionStore;

/// Coordinates one customer message end to end
pub struct Orchestrator {
    sessions: Arc<SessionStore>,
    exact_cache: Arc<ExactMatchCache>,
    semantic_cache: Arc<SemanticCache>,
    capture: CaptureService,
    situation: SituationService,
    generation: GenerationService,
    rules: Arc<RuleSet>,
    reconcile: ReconcileConfig,
    counters: ReconcileCounters,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sessions: Arc<SessionStore>,
        exact_cache: Arc<ExactMatchCache>,
        semantic_cache: Arc<SemanticCache>,
        capture: CaptureService,
        situation: SituationService,
        generation: GenerationService,
        rules: Arc<RuleSet>,
        reconcile: ReconcileConfig,
    ) -> Self {
        Self {
            sessions,
            exact_cache,
            semantic_cache,
            capture,
            situation,
            generation,
            rules,
            reconcile,
            counters: ReconcileCounters::default(),
        }
    }

    /// Process one customer message and produce a reply.
    ///
    /// Requests for the same session serialize on the session lock for the
    /// whole call, so context merges can never interleave.
    #[instrument(skip(self, message, product_context), fields(session_id = %session_id))]
    pub async fn handle_message(
        &self,
        session_id: &str,
        message: &str,
        product_context: Option<&str>,
    ) -> Result<AgentReply, DomainError> {
        if message.trim().is_empty() {
            return Err(DomainError::validation("Message must not be empty"));
        }

        let started = Instant::now();
        let mut latencies = StepLatencies::default();

        let session_handle = self.sessions.get_or_create(session_id);
        let mut session = session_handle.lock().await;

        // Cache lookups use the context as it stands before this message
        // changes it, so a replayed message sees the same key it was
        // written under
        let pre_context = session.captured_context.clone();
        let key = cache_key(message, &pre_context);
        let ctx_hash = context_hash(&pre_context);

        let cache_started = Instant::now();
        let cached = match self.exact_cache.get(&key).await {
            Some(reply) => Some((reply, CacheTier::Exact)),
            None => self
                .semantic_cache
                .lookup(message, &ctx_hash)
                .await
                .map(|reply| (reply, CacheTier::Semantic)),
        };
        latencies.cache_ms = cache_started.elapsed().as_millis() as u64;

        if let Some((mut reply, tier)) = cached {
            session.conversation_history.push(crate::domain::Turn {
                customer: message.to_string(),
                agent: reply.response.clone(),
            });

            reply.session_id = session_id.to_string();
            reply.turn_count = session.turn_count();
            reply.resistance_count = session.resistance_count;
            reply.diagnostics = Diagnostics {
                cache_hit: true,
                cache_tier: Some(tier),
                latency_ms: started.elapsed().as_millis() as u64,
                step_latencies: latencies,
                reconcile_triggered: false,
                generation_provider: None,
                generation_fell_back: false,
            };

            debug!(tier = ?tier, "Cache hit");
            return Ok(reply);
        }

        // Parallel pass: extraction and classification race their own
        // providers independently; neither branch cancels the other
        let parallel_started = Instant::now();
        let (extraction, classification) = tokio::join!(
            self.capture.extract(message, &pre_context),
            self.situation.classify(message, &pre_context),
        );
        let extraction = extraction?;
        let mut classification = classification?;
        latencies.extract_ms = parallel_started.elapsed().as_millis() as u64;
        latencies.classify_ms = latencies.extract_ms;

        let new_slots: Vec<String> = extraction
            .slots
            .keys()
            .filter(|slot| !session.captured_context.contains_key(*slot))
            .cloned()
            .collect();

        for (slot, value) in &extraction.slots {
            session
                .captured_context
                .insert(slot.clone(), value.clone());
        }

        let mut new_quote_count = 0;
        for quote in &extraction.new_quotes {
            if !session.captured_quotes.contains(quote) {
                session.captured_quotes.push(quote.clone());
                new_quote_count += 1;
            }
        }

        self.counters.checked.fetch_add(1, Ordering::Relaxed);
        let reconcile_reason = self.reconcile_reason(
            &classification,
            &new_slots,
            new_quote_count,
        );

        if let Some(reason) = reconcile_reason {
            self.record_reconcile(reason);
            let reconcile_started = Instant::now();

            // Re-classify with the merged context. A failed reconcile keeps
            // the initial classification rather than failing the request.
            match self
                .situation
                .classify(message, &session.captured_context)
                .await
            {
                Ok(updated) => classification = updated,
                Err(e) => {
                    warn!(error = %e, "Reconcile pass failed, keeping initial classification")
                }
            }

            latencies.reconcile_ms = reconcile_started.elapsed().as_millis() as u64;
            debug!(reason = ?reason, situation = %classification.situation, "Reconciled");
        }

        // Signal detection runs on the settled situation and the merged
        // context, so an extracted objection counts even when the wording
        // itself is mild
        self.update_resistance(&mut session, message, &classification.situation);

        let select_started = Instant::now();
        let selection = self.rules.select(
            &classification.situation,
            &session.captured_context,
            &session.principle_history,
            session.resistance_count,
        );
        let fallback_principle = self
            .rules
            .fallback_principle(session.resistance_count, &session.captured_context)
            .principle_id
            .clone();
        latencies.select_ms = select_started.elapsed().as_millis() as u64;

        let generate_started = Instant::now();
        let generated = self
            .generation
            .generate(
                message,
                &selection.principle,
                &session.captured_quotes,
                &classification.situation,
                &session.captured_context,
                product_context,
            )
            .await;
        latencies.generate_ms = generate_started.elapsed().as_millis() as u64;

        session
            .principle_history
            .push(selection.principle.principle_id.clone());
        session.conversation_history.push(crate::domain::Turn {
            customer: message.to_string(),
            agent: generated.text.clone(),
        });

        let reply = AgentReply {
            response: generated.text,
            situation: classification.situation,
            confidence: classification.confidence,
            stage: classification.stage,
            principle_id: selection.principle.principle_id,
            principle_name: selection.principle.name,
            selection_reason: selection.reason,
            fallback_principle_id: fallback_principle,
            session_id: session_id.to_string(),
            turn_count: session.turn_count(),
            resistance_count: session.resistance_count,
            diagnostics: Diagnostics {
                cache_hit: false,
                cache_tier: None,
                latency_ms: started.elapsed().as_millis() as u64,
                step_latencies: latencies,
                reconcile_triggered: reconcile_reason.is_some(),
                generation_provider: generated.provider,
                generation_fell_back: generated.fell_back,
            },
        };

        self.exact_cache.insert(key, reply.clone()).await;
        self.semantic_cache
            .insert(message, ctx_hash, reply.clone())
            .await;

        info!(
            situation = %reply.situation,
            principle = %reply.principle_id,
            latency_ms = reply.diagnostics.latency_ms,
            reconciled = reply.diagnostics.reconcile_triggered,
            "Message handled"
        );

        Ok(reply)
    }

    fn update_resistance(&self, session: &mut Session, message: &str, situation: &str) {
        let resists = shows_resistance(message, situation, &session.captured_context);
        let engages = shows_engagement(message, situation, &session.captured_context);

        if resists {
            session.resistance_count += 1;
            debug!(
                resistance_count = session.resistance_count,
                "Resistance signal detected"
            );
        } else if engages {
            session.resistance_count = 0;
        }
    }

    fn reconcile_reason(
        &self,
        classification: &ClassificationResult,
        new_slots: &[String],
        new_quote_count: usize,
    ) -> Option<ReconcileReason> {
        if classification.confidence < self.reconcile.confidence_threshold {
            return Some(ReconcileReason::LowConfidence);
        }

        let critical = self.rules.critical_slots();
        if new_slots.iter().any(|slot| critical.contains(&slot.as_str())) {
            return Some(ReconcileReason::NewCriticalSlot);
        }

        if new_slots.len() > self.reconcile.max_new_slots {
            return Some(ReconcileReason::ManyNewSlots);
        }

        if new_quote_count > self.reconcile.max_new_quotes {
            return Some(ReconcileReason::ManyNewQuotes);
        }

        None
    }

    fn record_reconcile(&self, reason: ReconcileReason) {
        self.counters.triggered.fetch_add(1, Ordering::Relaxed);

        let counter = match reason {
            ReconcileReason::LowConfidence => &self.counters.low_confidence,
            ReconcileReason::NewCriticalSlot => &self.counters.new_critical_slot,
            ReconcileReason::ManyNewSlots => &self.counters.many_new_slots,
            ReconcileReason::ManyNewQuotes => &self.counters.many_new_quotes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reconcile_stats(&self) -> ReconcileStats {
        let checked = self.counters.checked.load(Ordering::Relaxed);
        let triggered = self.counters.triggered.load(Ordering::Relaxed);
        let rate = if checked == 0 {
            0.0
        } else {
            triggered as f32 / checked as f32
        };

        ReconcileStats {
            checked,
            triggered,
            rate,
            low_confidence: self.counters.low_confidence.load(Ordering::Relaxed),
            new_critical_slot: self.counters.new_critical_slot.load(Ordering::Relaxed),
            many_new_slots: self.counters.many_new_slots.load(Ordering::Relaxed),
            many_new_quotes: self.counters.many_new_quotes.load(Ordering::Relaxed),
        }
    }

    pub async fn cache_stats(&self) -> CacheStats {
        CacheStats::new(
            self.exact_cache.stats().await,
            self.semantic_cache.stats().await,
        )
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

fn shows_resistance(message: &str, situation: &str, context: &BTreeMap<String, String>) -> bool {
    let lowered = message.to_lowercase();
    if RESISTANCE_SIGNALS.iter().any(|s| lowered.contains(s)) {
        return true;
    }

    if context.contains_key("objection") {
        return true;
    }

    if let Some(emotional_state) = context.get("emotional_state") {
        let emotional_state = emotional_state.to_lowercase();
        if NEGATIVE_EMOTIONS.iter().any(|e| emotional_state.contains(e)) {
            return true;
        }
    }

    RESISTANCE_SITUATIONS.contains(&situation)
}

fn shows_engagement(message: &str, situation: &str, context: &BTreeMap<String, String>) -> bool {
    let lowered = message.to_lowercase();
    if POSITIVE_SIGNALS.iter().any(|s| lowered.contains(s)) {
        return true;
    }

    if context.contains_key("commitment_signal") {
        return true;
    }

    if let Some(emotional_state) = context.get("emotional_state") {
        let emotional_state = emotional_state.to_lowercase();
        if POSITIVE_EMOTIONS.iter().any(|e| emotional_state.contains(e)) {
            return true;
        }
    }

    POSITIVE_SITUATIONS.contains(&situation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::rules::fixtures;
    use crate::domain::{
        ComplexityThresholds, CompletionRequest, CompletionResponse, LlmProvider,
    };
    use crate::infrastructure::retry::RetryPolicy;
    use crate::infrastructure::router::ProviderRouter;
    use crate::infrastructure::services::situation::ClassificationDefaults;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Answers each task kind with its own scripted output, keyed off the
    /// prompt prefix
    #[derive(Debug)]
    struct ScriptedProvider {
        extract: String,
        classify: String,
        generate: Result<String, String>,
        classify_calls: AtomicU64,
    }

    impl ScriptedProvider {
        fn new(extract: &str, classify: &str, generate: &str) -> Self {
            Self {
                extract: extract.to_string(),
                classify: classify.to_string(),
                generate: Ok(generate.to_string()),
                classify_calls: AtomicU64::new(0),
            }
        }

        fn with_failing_generation(mut self) -> Self {
            self.generate = Err("provider down".to_string());
            self
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, DomainError> {
            if request.prompt.starts_with("Extract slots") {
                Ok(CompletionResponse::new(self.extract.clone(), "mock"))
            } else if request.prompt.starts_with("Detect situation") {
                self.classify_calls.fetch_add(1, Ordering::Relaxed);
                Ok(CompletionResponse::new(self.classify.clone(), "mock"))
            } else {
                match &self.generate {
                    Ok(text) => Ok(CompletionResponse::new(text.clone(), "mock")),
                    Err(e) => Err(DomainError::provider("scripted", e)),
                }
            }
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    fn orchestrator(provider: Arc<ScriptedProvider>) -> Orchestrator {
        let router = Arc::new(ProviderRouter::new(
            vec![provider as Arc<dyn LlmProvider>],
            Duration::from_secs(5),
        ));
        let rules = Arc::new(fixtures::rule_set());
        let retry = RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        };

        Orchestrator::new(
            Arc::new(SessionStore::new()),
            Arc::new(ExactMatchCache::new(Duration::from_secs(60), 100)),
            Arc::new(SemanticCache::new(
                Arc::new(MockEmbeddingProvider::new(8)),
                0.92,
                Duration::from_secs(60),
                100,
            )),
            CaptureService::new(
                Arc::clone(&router),
                Arc::clone(&rules),
                retry.clone(),
                500,
                ComplexityThresholds::default(),
            ),
            SituationService::new(
                Arc::clone(&router),
                Arc::clone(&rules),
                retry.clone(),
                200,
                ComplexityThresholds::default(),
                ClassificationDefaults::default(),
            ),
            GenerationService::new(router, retry, 150, 5, ComplexityThresholds::default()),
            rules,
            ReconcileConfig::default(),
        )
    }

    fn confident_provider() -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider::new(
            r#"{"slots": {"product_interest": "fridge"}, "new_quotes": []}"#,
            r#"{"situation": "just_browsing", "confidence": 0.9, "stage": "discovery"}"#,
            "Take your time. Happy to answer anything.",
        ))
    }

    #[tokio::test]
    async fn test_full_pipeline_produces_reply() {
        let orchestrator = orchestrator(confident_provider());

        let reply = orchestrator
            .handle_message("s1", "just looking at fridges", None)
            .await
            .unwrap();

        assert_eq!(reply.situation, "just_browsing");
        assert_eq!(reply.response, "Take your time. Happy to answer anything.");
        assert_eq!(reply.turn_count, 1);
        assert!(!reply.diagnostics.cache_hit);

        let session = orchestrator.sessions().snapshot("s1").await.unwrap();
        assert_eq!(
            session.captured_context.get("product_interest"),
            Some(&"fridge".to_string())
        );
        assert_eq!(session.principle_history.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_message_hits_exact_cache() {
        let provider = confident_provider();
        let orchestrator = orchestrator(Arc::clone(&provider));

        // First turn captures product_interest, so replay it from a second
        // session to keep the pre-extraction context identical
        let first = orchestrator
            .handle_message("s1", "hello there", None)
            .await
            .unwrap();
        assert!(!first.diagnostics.cache_hit);

        let second = orchestrator
            .handle_message("s2", "hello there", None)
            .await
            .unwrap();

        assert!(second.diagnostics.cache_hit);
        assert_eq!(second.diagnostics.cache_tier, Some(CacheTier::Exact));
        assert_eq!(second.session_id, "s2");
        assert_eq!(second.response, first.response);
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let orchestrator = orchestrator(confident_provider());

        let result = orchestrator.handle_message("s1", "   ", None).await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_low_confidence_triggers_reconcile() {
        let provider = Arc::new(ScriptedProvider::new(
            r#"{"slots": {}, "new_quotes": []}"#,
            r#"{"situation": "just_browsing", "confidence": 0.4, "stage": "discovery"}"#,
            "Sure thing.",
        ));
        let orchestrator = orchestrator(Arc::clone(&provider));

        let reply = orchestrator
            .handle_message("s1", "hmm maybe", None)
            .await
            .unwrap();

        assert!(reply.diagnostics.reconcile_triggered);
        // Initial pass plus one reconcile pass
        assert_eq!(provider.classify_calls.load(Ordering::Relaxed), 2);

        let stats = orchestrator.reconcile_stats();
        assert_eq!(stats.triggered, 1);
        assert_eq!(stats.low_confidence, 1);
    }

    #[tokio::test]
    async fn test_new_critical_slot_triggers_reconcile() {
        let provider = Arc::new(ScriptedProvider::new(
            r#"{"slots": {"objection": "price"}, "new_quotes": []}"#,
            r#"{"situation": "price_shock_in_store", "confidence": 0.95, "stage": "objection_handling"}"#,
            "I hear you on the price.",
        ));
        let orchestrator = orchestrator(Arc::clone(&provider));

        let reply = orchestrator
            .handle_message("s1", "that price is steep", None)
            .await
            .unwrap();

        assert!(reply.diagnostics.reconcile_triggered);
        assert_eq!(orchestrator.reconcile_stats().new_critical_slot, 1);
    }

    #[tokio::test]
    async fn test_confident_turn_skips_reconcile() {
        let provider = confident_provider();
        let orchestrator = orchestrator(Arc::clone(&provider));

        let reply = orchestrator
            .handle_message("s1", "just looking around", None)
            .await
            .unwrap();

        assert!(!reply.diagnostics.reconcile_triggered);
        assert_eq!(provider.classify_calls.load(Ordering::Relaxed), 1);
        assert_eq!(orchestrator.reconcile_stats().triggered, 0);
    }

    #[tokio::test]
    async fn test_resistance_escalates_and_positive_resets() {
        let orchestrator = orchestrator(confident_provider());

        let first = orchestrator
            .handle_message("s1", "no thanks, not interested", None)
            .await
            .unwrap();
        assert_eq!(first.resistance_count, 1);
        assert_eq!(first.selection_reason, "fallback_after_resistance_1");

        let second = orchestrator
            .handle_message("s1", "okay sure, tell me more", None)
            .await
            .unwrap();
        assert_eq!(second.resistance_count, 0);
    }

    #[tokio::test]
    async fn test_generation_failure_uses_fallback_template() {
        let provider = Arc::new(
            ScriptedProvider::new(
                r#"{"slots": {}, "new_quotes": ["too expensive"]}"#,
                r#"{"situation": "price_shock_in_store", "confidence": 0.9, "stage": "objection_handling"}"#,
                "",
            )
            .with_failing_generation(),
        );
        let orchestrator = orchestrator(Arc::clone(&provider));

        let reply = orchestrator
            .handle_message("s1", "way too expensive for me", None)
            .await
            .unwrap();

        assert!(reply.diagnostics.generation_fell_back);
        assert!(reply.response.contains("too expensive"));
    }

    #[tokio::test]
    async fn test_fallback_reply_is_cached_for_identical_repeat() {
        let provider = Arc::new(
            ScriptedProvider::new(
                r#"{"slots": {}, "new_quotes": ["too expensive"]}"#,
                r#"{"situation": "price_shock_in_store", "confidence": 0.9, "stage": "objection_handling"}"#,
                "",
            )
            .with_failing_generation(),
        );
        let orchestrator = orchestrator(Arc::clone(&provider));

        let first = orchestrator
            .handle_message("s1", "way too expensive for me", None)
            .await
            .unwrap();
        assert!(first.diagnostics.generation_fell_back);

        let second = orchestrator
            .handle_message("s2", "way too expensive for me", None)
            .await
            .unwrap();

        assert!(second.diagnostics.cache_hit);
        assert_eq!(second.diagnostics.cache_tier, Some(CacheTier::Exact));
        assert_eq!(second.response, first.response);
    }

    #[tokio::test]
    async fn test_objection_slot_counts_as_resistance() {
        let provider = Arc::new(ScriptedProvider::new(
            r#"{"slots": {"objection": "price"}, "new_quotes": []}"#,
            r#"{"situation": "just_browsing", "confidence": 0.9, "stage": "discovery"}"#,
            "Fair point on the price.",
        ));
        let orchestrator = orchestrator(Arc::clone(&provider));

        // No pushback phrasing at all; the extracted objection alone counts
        let reply = orchestrator
            .handle_message("s1", "that seems steep for what it is", None)
            .await
            .unwrap();

        assert_eq!(reply.resistance_count, 1);
    }

    #[tokio::test]
    async fn test_resistance_situation_raises_count() {
        let provider = Arc::new(ScriptedProvider::new(
            r#"{"slots": {}, "new_quotes": []}"#,
            r#"{"situation": "price_shock_in_store", "confidence": 0.9, "stage": "objection_handling"}"#,
            "I hear you.",
        ));
        let orchestrator = orchestrator(Arc::clone(&provider));

        let reply = orchestrator
            .handle_message("s1", "hm, let me see the tag again", None)
            .await
            .unwrap();

        assert_eq!(reply.resistance_count, 1);
    }

    #[tokio::test]
    async fn test_commitment_signal_resets_resistance() {
        let provider = Arc::new(ScriptedProvider::new(
            r#"{"slots": {"commitment_signal": "asked about delivery"}, "new_quotes": []}"#,
            r#"{"situation": "just_browsing", "confidence": 0.9, "stage": "qualification"}"#,
            "We can deliver this week.",
        ));
        let orchestrator = orchestrator(Arc::clone(&provider));

        let first = orchestrator
            .handle_message("s1", "no thanks, not interested", None)
            .await
            .unwrap();
        assert_eq!(first.resistance_count, 1);

        let second = orchestrator
            .handle_message("s1", "when could you deliver it", None)
            .await
            .unwrap();
        assert_eq!(second.resistance_count, 0);
    }

    #[tokio::test]
    async fn test_many_new_slots_trigger_reconcile() {
        let provider = Arc::new(ScriptedProvider::new(
            r#"{"slots": {"product_interest": "fridge", "timeline": "this week", "decision_maker": "spouse", "past_experience": "old brand failed"}, "new_quotes": []}"#,
            r#"{"situation": "just_browsing", "confidence": 0.9, "stage": "discovery"}"#,
            "Plenty to choose from here.",
        ));
        let orchestrator = orchestrator(Arc::clone(&provider));

        let reply = orchestrator
            .handle_message("s1", "we need a fridge this week, ours failed, my spouse picked this brand last time", None)
            .await
            .unwrap();

        assert!(reply.diagnostics.reconcile_triggered);
        assert_eq!(provider.classify_calls.load(Ordering::Relaxed), 2);
        assert_eq!(orchestrator.reconcile_stats().many_new_slots, 1);
    }

    #[tokio::test]
    async fn test_many_new_quotes_trigger_reconcile() {
        let provider = Arc::new(ScriptedProvider::new(
            r#"{"slots": {}, "new_quotes": ["bit much for a fridge", "need it by friday"]}"#,
            r#"{"situation": "just_browsing", "confidence": 0.9, "stage": "discovery"}"#,
            "Let me show you two options.",
        ));
        let orchestrator = orchestrator(Arc::clone(&provider));

        let reply = orchestrator
            .handle_message("s1", "bit much for a fridge and I need it by friday", None)
            .await
            .unwrap();

        assert!(reply.diagnostics.reconcile_triggered);
        assert_eq!(orchestrator.reconcile_stats().many_new_quotes, 1);
    }

    #[tokio::test]
    async fn test_session_state_accumulates_across_turns() {
        let orchestrator = orchestrator(confident_provider());

        orchestrator
            .handle_message("s1", "first message here", None)
            .await
            .unwrap();
        let reply = orchestrator
            .handle_message("s1", "second message here", None)
            .await
            .unwrap();

        assert_eq!(reply.turn_count, 2);

        let session = orchestrator.sessions().snapshot("s1").await.unwrap();
        assert_eq!(session.conversation_history.len(), 2);
        assert_eq!(session.principle_history.len(), 2);
    }
}
