//! Thread consolidation: one representative message per conversation.
//!
//! Gmail tags every message with a `threadId`, so grouping needs no
//! structural probing of the API response — a message without a thread id
//! or timestamp is rejected outright instead of guessed at.

use std::collections::HashMap;

use crate::error::{QueryError, Result};
use crate::model::message::Message;

/// Which message represents a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// The earliest message in the thread.
    First,
    /// The latest message in the thread.
    Last,
}

impl Policy {
    /// Parse from a config/CLI string (`"first"` / `"last"`).
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Some(Self::First),
            "last" => Some(Self::Last),
            _ => None,
        }
    }
}

/// Group messages by `thread_id` and select one representative per thread.
///
/// Representatives are returned in the order their threads first appear in
/// the input, so output is stable and reproducible. Equal timestamps are
/// broken by the lexicographically smaller `message_id`, under both
/// policies.
///
/// Fails with [`QueryError::MalformedThread`] if any message lacks a
/// `thread_id` or `timestamp`; no partial result is returned.
pub fn consolidate(messages: &[Message], policy: Policy) -> Result<Vec<Message>> {
    // Validation pass first so the call is atomic.
    for msg in messages {
        if msg.thread_id.is_empty() {
            return Err(QueryError::MalformedThread {
                message_id: msg.message_id.clone(),
                reason: "missing thread id".to_string(),
            });
        }
        if msg.timestamp.is_none() {
            return Err(QueryError::MalformedThread {
                message_id: msg.message_id.clone(),
                reason: "missing timestamp".to_string(),
            });
        }
    }

    // thread_id -> position in `best`, in thread first-appearance order.
    let mut by_thread: HashMap<&str, usize> = HashMap::new();
    let mut best: Vec<&Message> = Vec::new();

    for msg in messages {
        match by_thread.get(msg.thread_id.as_str()) {
            None => {
                by_thread.insert(&msg.thread_id, best.len());
                best.push(msg);
            }
            Some(&slot) => {
                if wins(msg, best[slot], policy) {
                    best[slot] = msg;
                }
            }
        }
    }

    tracing::debug!(
        messages = messages.len(),
        threads = best.len(),
        ?policy,
        "Consolidated threads"
    );

    Ok(best.into_iter().cloned().collect())
}

/// Does `candidate` replace `current` as the thread representative?
fn wins(candidate: &Message, current: &Message, policy: Policy) -> bool {
    // Both timestamps validated present by `consolidate`.
    let (ct, bt) = (candidate.timestamp, current.timestamp);
    let earlier = ct < bt;
    let later = ct > bt;
    match policy {
        Policy::First if earlier => true,
        Policy::Last if later => true,
        // Equal timestamps: smaller message_id wins, either policy.
        _ => ct == bt && candidate.message_id < current.message_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_message(message_id: &str, thread_id: &str, hour: u32) -> Message {
        Message {
            message_id: message_id.to_string(),
            thread_id: thread_id.to_string(),
            timestamp: Some(Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()),
            from: "alice@example.com".to_string(),
            to: "bob@example.com".to_string(),
            cc: String::new(),
            bcc: String::new(),
            subject: "Hello".to_string(),
            body: "body".to_string(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_one_representative_per_thread() {
        let messages = vec![
            make_message("m1", "t1", 10),
            make_message("m2", "t1", 11),
            make_message("m3", "t2", 9),
            make_message("m4", "t1", 12),
        ];
        let reps = consolidate(&messages, Policy::First).expect("consolidate");
        assert_eq!(reps.len(), 2);
    }

    #[test]
    fn test_first_policy_picks_earliest() {
        let messages = vec![
            make_message("m2", "t1", 11),
            make_message("m1", "t1", 10),
            make_message("m3", "t1", 12),
        ];
        let reps = consolidate(&messages, Policy::First).expect("consolidate");
        assert_eq!(reps.len(), 1);
        assert_eq!(reps[0].message_id, "m1");
    }

    #[test]
    fn test_last_policy_picks_latest() {
        let messages = vec![
            make_message("m2", "t1", 11),
            make_message("m1", "t1", 10),
            make_message("m3", "t1", 12),
        ];
        let reps = consolidate(&messages, Policy::Last).expect("consolidate");
        assert_eq!(reps[0].message_id, "m3");
    }

    #[test]
    fn test_tiebreak_smaller_message_id_either_order() {
        let a = make_message("a", "t1", 10);
        let b = make_message("b", "t1", 10);

        for policy in [Policy::First, Policy::Last] {
            let reps = consolidate(&[a.clone(), b.clone()], policy).expect("consolidate");
            assert_eq!(reps[0].message_id, "a");

            let reps = consolidate(&[b.clone(), a.clone()], policy).expect("consolidate");
            assert_eq!(reps[0].message_id, "a");
        }
    }

    #[test]
    fn test_thread_order_follows_first_appearance() {
        let messages = vec![
            make_message("m1", "t2", 10),
            make_message("m2", "t1", 9),
            make_message("m3", "t3", 8),
        ];
        let reps = consolidate(&messages, Policy::Last).expect("consolidate");
        let threads: Vec<&str> = reps.iter().map(|m| m.thread_id.as_str()).collect();
        assert_eq!(threads, vec!["t2", "t1", "t3"]);
    }

    #[test]
    fn test_single_message_thread_unchanged() {
        let messages = vec![make_message("m1", "t1", 10)];
        for policy in [Policy::First, Policy::Last] {
            let reps = consolidate(&messages, policy).expect("consolidate");
            assert_eq!(reps.len(), 1);
            assert_eq!(reps[0].message_id, "m1");
            assert_eq!(reps[0].subject, "Hello");
        }
    }

    #[test]
    fn test_missing_thread_id_fails_atomically() {
        let mut bad = make_message("m2", "", 11);
        bad.thread_id.clear();
        let messages = vec![make_message("m1", "t1", 10), bad];

        let err = consolidate(&messages, Policy::First).unwrap_err();
        match err {
            QueryError::MalformedThread { message_id, .. } => assert_eq!(message_id, "m2"),
            other => panic!("expected MalformedThread, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_timestamp_fails_atomically() {
        let mut bad = make_message("m2", "t1", 11);
        bad.timestamp = None;
        let messages = vec![make_message("m1", "t1", 10), bad];

        let err = consolidate(&messages, Policy::Last).unwrap_err();
        assert!(matches!(err, QueryError::MalformedThread { .. }));
    }

    #[test]
    fn test_input_not_mutated() {
        let messages = vec![make_message("m1", "t1", 10), make_message("m2", "t1", 11)];
        let before: Vec<String> = messages.iter().map(|m| m.message_id.clone()).collect();
        let _ = consolidate(&messages, Policy::Last).expect("consolidate");
        let after: Vec<String> = messages.iter().map(|m| m.message_id.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_empty_input() {
        let reps = consolidate(&[], Policy::First).expect("consolidate");
        assert!(reps.is_empty());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(Policy::from_str_opt("first"), Some(Policy::First));
        assert_eq!(Policy::from_str_opt("LAST"), Some(Policy::Last));
        assert_eq!(Policy::from_str_opt("newest"), None);
    }
}
