//! Task classification for routed LLM calls
//!
//! Every call through the provider router names a logical task and carries a
//! complexity hint. Complexity is a pure classification of the input and
//! drives tiered model selection (fast vs. capable) before any racing starts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Logical task performed by a routed LLM call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Slot extraction from the customer message
    Extract,
    /// Situation classification
    Classify,
    /// Final natural-language response generation
    Generate,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskKind::Extract => "extract",
            TaskKind::Classify => "classify",
            TaskKind::Generate => "generate",
        };
        f.write_str(name)
    }
}

/// Estimated input complexity, used for tiered model selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

impl Complexity {
    /// Map complexity to the model tier each provider should use
    pub fn tier(self) -> ModelTier {
        match self {
            Complexity::Simple => ModelTier::Fast,
            Complexity::Medium | Complexity::Complex => ModelTier::Capable,
        }
    }
}

/// Model variant a provider should answer with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Cheap and fast, for simple inputs
    Fast,
    /// Capable and slower, for everything else
    Capable,
}

/// A fully described call for the provider router
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub task: TaskKind,
    pub prompt: String,
    pub max_tokens: u32,
    pub complexity: Complexity,
}

impl TaskSpec {
    pub fn new(task: TaskKind, prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            task,
            prompt: prompt.into(),
            max_tokens,
            complexity: Complexity::Medium,
        }
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }
}

/// Thresholds for the complexity heuristics
#[derive(Debug, Clone)]
pub struct ComplexityThresholds {
    pub word_count_simple: usize,
    pub word_count_complex: usize,
    pub context_richness_simple: usize,
    pub context_richness_complex: usize,
}

impl Default for ComplexityThresholds {
    fn default() -> Self {
        Self {
            word_count_simple: 15,
            word_count_complex: 60,
            context_richness_simple: 2,
            context_richness_complex: 8,
        }
    }
}

/// Vocabulary that marks an input as needing the capable tier
const COMPLEX_INDICATORS: &[&str] = &[
    "compare",
    "difference",
    "between",
    "versus",
    "alternative",
    "detailed",
    "explain",
    "how does",
    "why does",
    "what makes",
    "specific",
    "particular",
    "requirements",
    "specifications",
];

/// Estimate input complexity from the message and accumulated context.
///
/// Pure heuristic classification: short single-question messages with a thin
/// context are simple; long messages, multi-question structure, comparison
/// vocabulary or a rich context are complex. Generation leans medium because
/// it always synthesizes over the full context.
pub fn estimate_complexity(
    message: &str,
    context: &BTreeMap<String, String>,
    task: TaskKind,
    thresholds: &ComplexityThresholds,
) -> Complexity {
    let word_count = message.split_whitespace().count();
    let context_richness = context.values().filter(|v| !v.is_empty()).count();
    let has_multiple_questions = message.matches('?').count() > 1;

    let lowered = message.to_lowercase();
    let has_complex_vocab = COMPLEX_INDICATORS.iter().any(|ind| lowered.contains(ind));

    let base = match task {
        TaskKind::Generate => Complexity::Medium,
        TaskKind::Extract => {
            if context_richness < thresholds.context_richness_simple {
                Complexity::Simple
            } else {
                Complexity::Medium
            }
        }
        TaskKind::Classify => Complexity::Medium,
    };

    if word_count < thresholds.word_count_simple
        && context_richness < thresholds.context_richness_simple
        && !has_multiple_questions
    {
        Complexity::Simple
    } else if word_count > thresholds.word_count_complex
        || has_multiple_questions
        || has_complex_vocab
        || context_richness > thresholds.context_richness_complex
    {
        Complexity::Complex
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_short_message_is_simple() {
        let complexity = estimate_complexity(
            "How much is this?",
            &BTreeMap::new(),
            TaskKind::Classify,
            &ComplexityThresholds::default(),
        );
        assert_eq!(complexity, Complexity::Simple);
    }

    #[test]
    fn test_multiple_questions_are_complex() {
        let complexity = estimate_complexity(
            "Does it have a warranty? And what about delivery?",
            &BTreeMap::new(),
            TaskKind::Classify,
            &ComplexityThresholds::default(),
        );
        assert_eq!(complexity, Complexity::Complex);
    }

    #[test]
    fn test_comparison_vocabulary_is_complex() {
        // Long enough to clear the simple gate, so the vocabulary decides
        let complexity = estimate_complexity(
            "Can you walk me through the difference between these two models and what makes one better",
            &BTreeMap::new(),
            TaskKind::Generate,
            &ComplexityThresholds::default(),
        );
        assert_eq!(complexity, Complexity::Complex);
    }

    #[test]
    fn test_short_comparison_stays_simple() {
        // Under the word threshold the simple gate wins over vocabulary
        let complexity = estimate_complexity(
            "What is the difference?",
            &BTreeMap::new(),
            TaskKind::Classify,
            &ComplexityThresholds::default(),
        );
        assert_eq!(complexity, Complexity::Simple);
    }

    #[test]
    fn test_rich_context_is_not_simple() {
        let context = context_with(&[
            ("pain", "old fridge broke"),
            ("budget_signal", "under 500"),
            ("objection", "price"),
        ]);
        let complexity = estimate_complexity(
            "Okay tell me more about this one and also the other one over there",
            &context,
            TaskKind::Generate,
            &ComplexityThresholds::default(),
        );
        assert_ne!(complexity, Complexity::Simple);
    }

    #[test]
    fn test_simple_maps_to_fast_tier() {
        assert_eq!(Complexity::Simple.tier(), ModelTier::Fast);
        assert_eq!(Complexity::Medium.tier(), ModelTier::Capable);
        assert_eq!(Complexity::Complex.tier(), ModelTier::Capable);
    }
}
