//! Prompt rendering for the three routed tasks
//!
//! Prompts are deliberately compressed: the enrichment calls run on every
//! request and token count is latency.

use std::collections::BTreeMap;

use crate::domain::rules::Principle;

fn render_context(context: &BTreeMap<String, String>) -> String {
    let parts: Vec<String> = context
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}:{}", k, v))
        .collect();

    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(", ")
    }
}

/// Prompt for slot extraction
pub fn extraction_prompt(
    message: &str,
    context: &BTreeMap<String, String>,
    slot_names: &[&str],
) -> String {
    format!(
        "Extract slots from message. Return JSON only.\n\
         Slots: {}\n\
         Context: {}\n\
         Message: \"{}\"\n\
         Format: {{\"slots\": {{\"slot\": \"value\"}}, \"new_quotes\": [\"quote\"]}}\n\
         Extract verbatim quotes. Return ONLY valid JSON.",
        slot_names.join(", "),
        render_context(context),
        message
    )
}

/// Prompt for situation classification
pub fn classification_prompt(
    message: &str,
    context: &BTreeMap<String, String>,
    situation_keys: &[&str],
) -> String {
    format!(
        "Detect situation from message. Return JSON only.\n\
         Situations: {}\n\
         Context: {}\n\
         Message: \"{}\"\n\
         Format: {{\"situation\": \"key\", \"confidence\": 0.0-1.0, \"stage\": \
         \"discovery|qualification|presentation|objection_handling|closing\"}}\n\
         Return ONLY valid JSON.",
        situation_keys.join(", "),
        render_context(context),
        message
    )
}

/// Prompt for final response generation
pub fn generation_prompt(
    principle: &Principle,
    quotes: &[String],
    situation: &str,
    context: &BTreeMap<String, String>,
    product_context: Option<&str>,
) -> String {
    let quotes_str = if quotes.is_empty() {
        "none".to_string()
    } else {
        quotes.join(" | ")
    };

    let pain = context
        .get("pain")
        .filter(|v| !v.is_empty())
        .map(String::as_str)
        .unwrap_or("none");

    format!(
        "Generate natural sales response. MAX 2 sentences.\n\
         Principle: {} - {}\n\
         Quotes: {}\n\
         Situation: {} | Pain: {} | Product: {}\n\
         Rules: Use exact words back, acknowledge concern first, sound casual, no bullets, no jargon.\n\
         Response:",
        principle.name,
        principle.intervention,
        quotes_str,
        situation,
        pain,
        product_context.unwrap_or("none")
    )
}
