//! Domain layer: traits, models, and errors

pub mod embedding;
pub mod enrichment;
mod error;
pub mod llm;
pub mod prompt;
pub mod reply;
pub mod rules;
pub mod session;
pub mod task;

pub use embedding::{cosine_similarity, EmbeddingProvider};
pub use enrichment::{ClassificationResult, ExtractionResult};
pub use error::DomainError;
pub use llm::{CompletionRequest, CompletionResponse, LlmProvider, Usage};
pub use reply::{AgentReply, CacheTier, Diagnostics, StepLatencies};
pub use rules::{Principle, RuleSet, Selection};
pub use session::{Session, SessionStore, Turn};
pub use task::{estimate_complexity, Complexity, ComplexityThresholds, ModelTier, TaskKind, TaskSpec};
