//! Engine reply payload and diagnostics

use serde::{Deserialize, Serialize};

/// Which cache tier answered a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTier {
    Exact,
    Semantic,
}

/// Per-step latency breakdown, in milliseconds
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StepLatencies {
    pub cache_ms: u64,
    pub extract_ms: u64,
    pub classify_ms: u64,
    pub reconcile_ms: u64,
    pub select_ms: u64,
    pub generate_ms: u64,
}

/// Request-level diagnostics surfaced next to the reply
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub cache_hit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_tier: Option<CacheTier>,
    pub latency_ms: u64,
    pub step_latencies: StepLatencies,
    pub reconcile_triggered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_provider: Option<String>,
    /// True when generation failed and the canned fallback reply was used
    pub generation_fell_back: bool,
}

/// Final engine output for one customer message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentReply {
    /// Customer-facing response text
    pub response: String,
    pub situation: String,
    pub confidence: f32,
    pub stage: String,
    pub principle_id: String,
    pub principle_name: String,
    pub selection_reason: String,
    /// Principle to pivot to if this one fails to land
    pub fallback_principle_id: String,
    pub session_id: String,
    pub turn_count: usize,
    pub resistance_count: u32,
    pub diagnostics: Diagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_tier_serialization() {
        assert_eq!(
            serde_json::to_string(&CacheTier::Exact).unwrap(),
            "\"exact\""
        );
        assert_eq!(
            serde_json::to_string(&CacheTier::Semantic).unwrap(),
            "\"semantic\""
        );
    }

    #[test]
    fn test_diagnostics_omits_absent_tier() {
        let diagnostics = Diagnostics::default();
        let json = serde_json::to_string(&diagnostics).unwrap();

        assert!(!json.contains("cache_tier"));
        assert!(json.contains("\"cache_hit\":false"));
    }
}
