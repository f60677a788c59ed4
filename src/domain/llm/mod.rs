//! LLM provider domain models and traits

mod provider;
mod request;
mod response;

pub use provider::LlmProvider;
pub use request::CompletionRequest;
pub use response::{CompletionResponse, Usage};

#[cfg(test)]
pub use provider::mock::MockLlmProvider;
