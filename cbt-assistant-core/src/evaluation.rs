//! Heuristic scoring of assistant replies for CBT technique usage

use serde::{Deserialize, Serialize};

const THOUGHT_TERMS: &[&str] = &["think", "thought", "believe", "feel", "feeling"];
const REFLECTION_TERMS: &[&str] = &["notice", "aware", "reflect", "consider", "explore"];
const CBT_TERMS: &[&str] = &["pattern", "behavior", "situation", "evidence", "challenge"];

/// Four independent signals computed over one reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CbtEvaluation {
    pub asks_questions: bool,
    pub explores_thoughts: bool,
    pub encourages_reflection: bool,
    pub uses_cbt_language: bool,
}

/// Score a reply.
///
/// Keyword checks are case-insensitive substring tests without word
/// boundaries, so "thinking" counts for "think". The question check looks for
/// a literal `?`.
pub fn evaluate(text: &str) -> CbtEvaluation {
    let lowered = text.to_lowercase();
    let contains_any = |terms: &[&str]| terms.iter().any(|term| lowered.contains(term));

    CbtEvaluation {
        asks_questions: text.contains('?'),
        explores_thoughts: contains_any(THOUGHT_TERMS),
        encourages_reflection: contains_any(REFLECTION_TERMS),
        uses_cbt_language: contains_any(CBT_TERMS),
    }
}
