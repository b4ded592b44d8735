//! Classification rule sets and rules-file loading.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};

/// One named classification target: a destination folder plus the regex
/// patterns that route a thread into it.
///
/// Any single pattern matching suffices; order within a set is irrelevant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    /// Destination folder name. Unique across the configuration; also
    /// acts as the rule set's identity in error messages.
    pub name: String,

    /// Regex patterns, evaluated as substring searches (not anchored).
    pub patterns: Vec<String>,

    /// Higher value wins. Equal priorities are broken by declaration
    /// order, first-declared first. Defaults to 0.
    #[serde(default)]
    pub priority: i64,
}

/// Load rule sets from a JSON file.
///
/// The file is a JSON array so declaration order is preserved — that
/// order is the documented tie-break between equal priorities:
///
/// ```json
/// [
///   {"name": "receipts", "patterns": ["invoice", "receipt"], "priority": 10},
///   {"name": "lists",    "patterns": ["unsubscribe"]}
/// ]
/// ```
pub fn load_rules(path: &Path) -> Result<Vec<RuleSet>> {
    let contents = std::fs::read_to_string(path).map_err(|e| QueryError::io(path, e))?;
    let rules: Vec<RuleSet> =
        serde_json::from_str(&contents).map_err(|e| QueryError::InvalidRules {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    validate_rules(&rules).map_err(|reason| QueryError::InvalidRules {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(rules)
}

/// Check structural invariants: unique names, no empty names.
///
/// Pattern compilation is checked separately by the classifier so a
/// broken regex is reported with its rule set name.
pub fn validate_rules(rules: &[RuleSet]) -> std::result::Result<(), String> {
    let mut seen = HashSet::new();
    for rule in rules {
        if rule.name.is_empty() {
            return Err("rule set with empty name".to_string());
        }
        if !seen.insert(rule.name.as_str()) {
            return Err(format!("duplicate rule set name '{}'", rule.name));
        }
    }
    Ok(())
}
