//! Rule-based classification of a message's searchable text.
//!
//! Rule sets are tried in descending priority order (declaration order
//! breaks ties); within a set, any pattern matching routes the thread to
//! that set's folder.

use regex::{Regex, RegexBuilder};

use crate::error::{QueryError, Result};
use crate::model::rules::RuleSet;

/// Decide the destination folder for `searchable_text`, or `None` when no
/// rule set matches (caller leaves the thread in the default location).
///
/// Every pattern of every rule set is compiled before any matching, so a
/// malformed pattern always fails the call with
/// [`QueryError::InvalidRule`] — even when a higher-priority rule would
/// have matched first. Matching is an unanchored search; with
/// `case_sensitive = false` patterns match case-insensitively.
///
/// Pure function: no I/O, `rules` is untouched, identical inputs always
/// yield identical output.
pub fn classify(
    searchable_text: &str,
    rules: &[RuleSet],
    case_sensitive: bool,
) -> Result<Option<String>> {
    let compiled = compile_rules(rules, case_sensitive)?;

    // Descending priority; sort_by_key is stable, so equal priorities keep
    // declaration order.
    let mut order: Vec<usize> = (0..rules.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(rules[i].priority));

    for i in order {
        if compiled[i].iter().any(|re| re.is_match(searchable_text)) {
            tracing::debug!(rule = %rules[i].name, "Rule set matched");
            return Ok(Some(rules[i].name.clone()));
        }
    }

    Ok(None)
}

/// Compile every pattern of every rule set, failing on the first invalid
/// one with its rule set name attached.
fn compile_rules(rules: &[RuleSet], case_sensitive: bool) -> Result<Vec<Vec<Regex>>> {
    rules
        .iter()
        .map(|rule| {
            rule.patterns
                .iter()
                .map(|pattern| {
                    RegexBuilder::new(pattern)
                        .case_insensitive(!case_sensitive)
                        .build()
                        .map_err(|source| QueryError::InvalidRule {
                            rule: rule.name.clone(),
                            pattern: pattern.clone(),
                            source,
                        })
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, patterns: &[&str], priority: i64) -> RuleSet {
        RuleSet {
            name: name.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            priority,
        }
    }

    #[test]
    fn test_higher_priority_wins_despite_earlier_match() {
        let rules = vec![
            rule("folder1", &["cookies"], 0),
            rule("folder2", &["party"], 99),
        ];
        let dest = classify("subject: cookies party", &rules, false).expect("classify");
        assert_eq!(dest, Some("folder2".to_string()));
    }

    #[test]
    fn test_declaration_order_breaks_priority_ties() {
        let rules = vec![
            rule("first-declared", &["cookies"], 5),
            rule("second-declared", &["cookies"], 5),
        ];
        let dest = classify("subject: cookies", &rules, false).expect("classify");
        assert_eq!(dest, Some("first-declared".to_string()));
    }

    #[test]
    fn test_case_insensitive_by_default_flag() {
        let rules = vec![rule("folder", &["Cookies"], 0)];

        let dest = classify("from: a\nsubject: fresh cookies", &rules, false).expect("classify");
        assert_eq!(dest, Some("folder".to_string()));

        let dest = classify("from: a\nsubject: fresh cookies", &rules, true).expect("classify");
        assert_eq!(dest, None);
    }

    #[test]
    fn test_no_match_returns_none() {
        let rules = vec![rule("folder", &["invoice"], 0)];
        let dest = classify("subject: vacation photos", &rules, false).expect("classify");
        assert_eq!(dest, None);
    }

    #[test]
    fn test_any_pattern_in_set_suffices() {
        let rules = vec![rule("folder", &["zzz-no-match", "photos"], 0)];
        let dest = classify("subject: vacation photos", &rules, false).expect("classify");
        assert_eq!(dest, Some("folder".to_string()));
    }

    #[test]
    fn test_unanchored_regex_search() {
        let rules = vec![rule("folder", &["(from|to|subject): .*invoice"], 0)];
        let text = "from: billing@example.com\nsubject: your invoice is ready\nbody text";
        let dest = classify(text, &rules, false).expect("classify");
        assert_eq!(dest, Some("folder".to_string()));
    }

    #[test]
    fn test_malformed_pattern_fails_even_when_other_rule_matches() {
        // The broken low-priority rule must fail the call even though the
        // high-priority rule matches.
        let rules = vec![
            rule("good", &["cookies"], 99),
            rule("broken", &["(unbalanced"], 0),
        ];
        let err = classify("subject: cookies", &rules, false).unwrap_err();
        match err {
            QueryError::InvalidRule { rule, pattern, .. } => {
                assert_eq!(rule, "broken");
                assert_eq!(pattern, "(unbalanced");
            }
            other => panic!("expected InvalidRule, got {other:?}"),
        }
    }

    #[test]
    fn test_idempotent() {
        let rules = vec![
            rule("a", &["alpha"], 1),
            rule("b", &["beta"], 2),
        ];
        let first = classify("subject: beta alpha", &rules, false).expect("classify");
        let second = classify("subject: beta alpha", &rules, false).expect("classify");
        assert_eq!(first, second);
        assert_eq!(first, Some("b".to_string()));
    }

    #[test]
    fn test_empty_rules() {
        let dest = classify("subject: anything", &[], false).expect("classify");
        assert_eq!(dest, None);
    }

    #[test]
    fn test_negative_priority_loses_to_default() {
        let rules = vec![
            rule("deprioritized", &["cookies"], -5),
            rule("normal", &["cookies"], 0),
        ];
        let dest = classify("subject: cookies", &rules, false).expect("classify");
        assert_eq!(dest, Some("normal".to_string()));
    }
}
