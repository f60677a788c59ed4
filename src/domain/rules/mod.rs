//! Rule tables driving situation handling and principle selection
//!
//! These are configuration data, not engine state: four JSON files loaded
//! once at startup into an immutable [`RuleSet`]. The selection itself is a
//! pure top-down table lookup with no I/O.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::DomainError;

/// A persuasion principle shaping the generated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principle {
    pub principle_id: String,
    pub name: String,
    pub definition: String,
    pub mechanism: String,
    pub intervention: String,
}

/// A classifiable customer situation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SituationDef {
    #[serde(default)]
    pub signals: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// One row of the principle-selection table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorRule {
    pub situation: String,
    /// Context slots that must be present for the rule to fire
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(rename = "use")]
    pub use_principle: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Fallback principles keyed by escalation stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorFallback {
    pub default: String,
    #[serde(default)]
    pub when_no_context: Option<String>,
    #[serde(default)]
    pub after_failed_attempt_1: Option<String>,
    #[serde(default)]
    pub after_failed_attempt_2: Option<String>,
}

/// One extractable slot in the capture schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotDef {
    #[serde(default)]
    pub description: String,
    /// Critical slots force a reconcile pass when newly captured
    #[serde(default)]
    pub critical: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct SelectorConfig {
    rules: Vec<SelectorRule>,
    fallback: SelectorFallback,
    /// Legacy rule-name spellings mapped to real situation keys
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CaptureSchema {
    slots: BTreeMap<String, SlotDef>,
}

/// Result of principle selection
#[derive(Debug, Clone)]
pub struct Selection {
    pub principle: Principle,
    pub reason: String,
}

/// How many history entries to inspect when avoiding repetition
const RECENT_HISTORY_WINDOW: usize = 5;
/// A principle used this often recently is skipped
const MAX_RECENT_USES: usize = 2;

/// Immutable rule tables loaded at startup
#[derive(Debug, Clone)]
pub struct RuleSet {
    principles: BTreeMap<String, Principle>,
    situations: BTreeMap<String, SituationDef>,
    rules: Vec<SelectorRule>,
    fallback: SelectorFallback,
    slots: BTreeMap<String, SlotDef>,
    situation_aliases: BTreeMap<String, String>,
}

impl RuleSet {
    pub fn new(
        principles: Vec<Principle>,
        situations: BTreeMap<String, SituationDef>,
        rules: Vec<SelectorRule>,
        fallback: SelectorFallback,
        slots: BTreeMap<String, SlotDef>,
    ) -> Result<Self, DomainError> {
        if principles.is_empty() {
            return Err(DomainError::configuration("No principles configured"));
        }

        let principles: BTreeMap<String, Principle> = principles
            .into_iter()
            .map(|p| (p.principle_id.clone(), p))
            .collect();

        if !principles.contains_key(&fallback.default) {
            return Err(DomainError::configuration(format!(
                "Fallback principle '{}' is not defined",
                fallback.default
            )));
        }

        Ok(Self {
            principles,
            situations,
            rules,
            fallback,
            slots,
            situation_aliases: BTreeMap::new(),
        })
    }

    /// Attach legacy rule-name spellings that map onto real situation keys
    pub fn with_aliases(mut self, aliases: BTreeMap<String, String>) -> Self {
        self.situation_aliases = aliases;
        self
    }

    /// Load the four rule tables from a configuration directory
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let dir = dir.as_ref();

        let principles: Vec<Principle> = read_json(&dir.join("principles.json"))?;
        let situations: BTreeMap<String, SituationDef> = read_json(&dir.join("situations.json"))?;
        let selector: SelectorConfig = read_json(&dir.join("principle_selector.json"))?;
        let capture: CaptureSchema = read_json(&dir.join("capture_schema.json"))?;

        Ok(Self::new(
            principles,
            situations,
            selector.rules,
            selector.fallback,
            capture.slots,
        )?
        .with_aliases(selector.aliases))
    }

    pub fn situation_keys(&self) -> Vec<&str> {
        self.situations.keys().map(String::as_str).collect()
    }

    pub fn has_situation(&self, key: &str) -> bool {
        self.situations.contains_key(key)
    }

    pub fn slot_names(&self) -> Vec<&str> {
        self.slots.keys().map(String::as_str).collect()
    }

    /// Slots that force a reconcile pass when newly captured
    pub fn critical_slots(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|(_, def)| def.critical)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn principle(&self, id: &str) -> Option<&Principle> {
        self.principles.get(id)
    }

    /// Select the principle for a detected situation.
    ///
    /// Pure table lookup: escalation fallbacks first, then the first rule
    /// whose situation and required slots match and whose principle has not
    /// been overused recently, then the default fallback.
    pub fn select(
        &self,
        situation: &str,
        context: &BTreeMap<String, String>,
        principle_history: &[String],
        resistance_count: u32,
    ) -> Selection {
        if resistance_count >= 2 {
            if let Some(selection) =
                self.fallback_selection(&self.fallback.after_failed_attempt_2, "fallback_after_resistance_2")
            {
                return selection;
            }
        } else if resistance_count >= 1 {
            if let Some(selection) =
                self.fallback_selection(&self.fallback.after_failed_attempt_1, "fallback_after_resistance_1")
            {
                return selection;
            }
        }

        if context.is_empty() {
            if let Some(selection) =
                self.fallback_selection(&self.fallback.when_no_context, "fallback_no_context")
            {
                return selection;
            }
        }

        let situation = self.normalize_situation(situation);

        for rule in &self.rules {
            if self.normalize_situation(&rule.situation) != situation {
                continue;
            }

            if !rule.requires.iter().all(|slot| context.contains_key(slot)) {
                continue;
            }

            let Some(principle) = self.principles.get(&rule.use_principle) else {
                warn!(principle_id = %rule.use_principle, "Rule references unknown principle, skipping");
                continue;
            };

            if recent_uses(&rule.use_principle, principle_history) >= MAX_RECENT_USES {
                continue;
            }

            let reason = match &rule.note {
                Some(note) => format!("rule_match: {}", note),
                None => "rule_match: direct match".to_string(),
            };

            return Selection {
                principle: principle.clone(),
                reason,
            };
        }

        Selection {
            principle: self.principles[&self.fallback.default].clone(),
            reason: "no_rule_match".to_string(),
        }
    }

    /// Principle to fall back to if the selected one fails to land,
    /// escalating with the resistance count
    pub fn fallback_principle(
        &self,
        resistance_count: u32,
        context: &BTreeMap<String, String>,
    ) -> &Principle {
        let id = if resistance_count >= 2 {
            self.fallback.after_failed_attempt_2.as_ref()
        } else if resistance_count >= 1 {
            self.fallback.after_failed_attempt_1.as_ref()
        } else if context.is_empty() {
            self.fallback.when_no_context.as_ref()
        } else {
            None
        };

        id.and_then(|id| self.principles.get(id))
            .unwrap_or(&self.principles[&self.fallback.default])
    }

    /// Map a legacy rule-name spelling onto its real situation key.
    /// Already-valid keys pass through untouched.
    fn normalize_situation<'a>(&'a self, situation: &'a str) -> &'a str {
        if self.situations.contains_key(situation) {
            return situation;
        }

        self.situation_aliases
            .get(situation)
            .map(String::as_str)
            .unwrap_or(situation)
    }

    fn fallback_selection(&self, id: &Option<String>, reason: &str) -> Option<Selection> {
        let id = id.as_ref()?;
        let principle = self.principles.get(id)?;

        Some(Selection {
            principle: principle.clone(),
            reason: reason.to_string(),
        })
    }
}

fn recent_uses(principle_id: &str, history: &[String]) -> usize {
    history
        .iter()
        .rev()
        .take(RECENT_HISTORY_WINDOW)
        .filter(|id| id.as_str() == principle_id)
        .count()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, DomainError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        DomainError::configuration(format!("Failed to read {}: {}", path.display(), e))
    })?;

    serde_json::from_str(&raw).map_err(|e| {
        DomainError::configuration(format!("Failed to parse {}: {}", path.display(), e))
    })
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
    fn test_rule_match_with_required_slot() {
        let rules = fixtures::rule_set();
        let context = context_with(&[("objection", "price")]);

        let selection = rules.select("price_shock_in_store", &context, &[], 0);

        assert_eq!(selection.principle.principle_id, "social_proof");
        assert!(selection.reason.starts_with("rule_match"));
    }

    #[test]
    fn test_missing_required_slot_falls_through() {
        let rules = fixtures::rule_set();
        let context = context_with(&[("product_interest", "fridge")]);

        let selection = rules.select("price_shock_in_store", &context, &[], 0);

        assert_eq!(selection.principle.principle_id, "reciprocity");
        assert_eq!(selection.reason, "no_rule_match");
    }

    #[test]
    fn test_empty_context_uses_no_context_fallback() {
        let rules = fixtures::rule_set();

        let selection = rules.select("quality_doubt", &BTreeMap::new(), &[], 0);

        assert_eq!(selection.reason, "fallback_no_context");
    }

    #[test]
    fn test_resistance_escalation() {
        let rules = fixtures::rule_set();
        let context = context_with(&[("objection", "price")]);

        let first = rules.select("price_shock_in_store", &context, &[], 1);
        assert_eq!(first.reason, "fallback_after_resistance_1");

        let second = rules.select("price_shock_in_store", &context, &[], 2);
        assert_eq!(second.reason, "fallback_after_resistance_2");
        assert_eq!(second.principle.principle_id, "scarcity");
    }

    #[test]
    fn test_overused_principle_is_skipped() {
        let rules = fixtures::rule_set();
        let context = context_with(&[("objection", "price")]);
        let history = vec!["social_proof".to_string(), "social_proof".to_string()];

        let selection = rules.select("price_shock_in_store", &context, &history, 0);

        assert_ne!(selection.principle.principle_id, "social_proof");
    }

    #[test]
    fn test_fallback_principle_escalates() {
        let rules = fixtures::rule_set();
        let context = context_with(&[("objection", "price")]);

        assert_eq!(
            rules.fallback_principle(0, &context).principle_id,
            "reciprocity"
        );
        assert_eq!(
            rules.fallback_principle(1, &context).principle_id,
            "social_proof"
        );
        assert_eq!(
            rules.fallback_principle(2, &context).principle_id,
            "scarcity"
        );
    }

    #[test]
    fn test_alias_maps_to_real_situation_key() {
        let aliases: BTreeMap<String, String> =
            [("price_objection".to_string(), "price_shock_in_store".to_string())]
                .into_iter()
                .collect();
        let rules = fixtures::rule_set().with_aliases(aliases);
        let context = context_with(&[("objection", "price")]);

        let selection = rules.select("price_objection", &context, &[], 0);

        assert_eq!(selection.principle.principle_id, "social_proof");
        assert!(selection.reason.starts_with("rule_match"));
    }

    #[test]
    fn test_critical_slots_from_schema() {
        let rules = fixtures::rule_set();
        let critical = rules.critical_slots();

        assert!(critical.contains(&"objection"));
        assert!(critical.contains(&"pain"));
        assert!(!critical.contains(&"timeline"));
    }

    #[test]
    fn test_unknown_fallback_principle_rejected() {
        let result = RuleSet::new(
            vec![Principle {
                principle_id: "a".to_string(),
                name: "A".to_string(),
                definition: String::new(),
                mechanism: String::new(),
                intervention: String::new(),
            }],
            BTreeMap::new(),
            vec![],
            SelectorFallback {
                default: "missing".to_string(),
                when_no_context: None,
                after_failed_attempt_1: None,
                after_failed_attempt_2: None,
            },
            BTreeMap::new(),
        );

        assert!(matches!(
            result,
            Err(DomainError::Configuration { .. })
        ));
    }
}
