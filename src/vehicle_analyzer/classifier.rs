//! Decision classifiers - free text to Decision

use crate::models::Decision;

/// Reduces a model reply to an entry decision
pub trait DecisionClassifier: Send + Sync {
    fn classify(&self, analysis: &str) -> Decision;
}

/// Phrases that deny entry. Checked before ALLOW_PHRASES.
const DENY_PHRASES: &[&str] = &["not allowed", "should not be allowed", "no, "];

const ALLOW_PHRASES: &[&str] = &["can be allowed", "should be allowed", "yes, "];

/// Case-insensitive substring matcher.
///
/// A heuristic over unstructured text: any deny phrase wins, then any
/// allow phrase, otherwise the vehicle goes to human review.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl DecisionClassifier for KeywordClassifier {
    fn classify(&self, analysis: &str) -> Decision {
        let lower = analysis.to_lowercase();

        if DENY_PHRASES.iter().any(|p| lower.contains(p)) {
            Decision::Deny
        } else if ALLOW_PHRASES.iter().any(|p| lower.contains(p)) {
            Decision::Allow
        } else {
            Decision::Review
        }
    }
}
