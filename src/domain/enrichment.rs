//! Enrichment results produced by the parallel pass
//!
//! Extraction and classification both come back from the providers as JSON
//! text. Parsing is lenient about code fences and surrounding prose because
//! upstream models do not always honor "return JSON only".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Slots and quotes captured from one customer message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub slots: BTreeMap<String, String>,
    #[serde(default)]
    pub new_quotes: Vec<String>,
}

impl ExtractionResult {
    /// Parse from provider output, dropping empty slot values
    pub fn parse(text: &str) -> Option<Self> {
        let json = extract_json_object(text)?;
        let mut result: ExtractionResult = serde_json::from_str(json).ok()?;
        result.slots.retain(|_, v| !v.is_empty());
        Some(result)
    }
}

/// Classified customer situation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub situation: String,
    pub confidence: f32,
    #[serde(default = "default_stage")]
    pub stage: String,
}

fn default_stage() -> String {
    "discovery".to_string()
}

impl ClassificationResult {
    pub fn parse(text: &str) -> Option<Self> {
        let json = extract_json_object(text)?;
        serde_json::from_str(json).ok()
    }
}

/// Locate the outermost JSON object in provider output
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;

    if end < start {
        return None;
    }

    Some(&text[start..=end])
}
