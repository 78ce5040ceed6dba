//! Early-stop rule for the refinement loop
//!
//! The loop only asks a [`TerminationPolicy`] whether a critique signals that
//! the draft is good enough; the iteration budget is applied separately in
//! [`TerminationDecision::evaluate`].

use serde::{Deserialize, Serialize};

/// Phrases that end refinement when found anywhere in a critique, any case
pub const STOP_PHRASES: [&str; 3] = ["ready to publish", "score: 9", "score: 10"];

/// Decides whether a critique means the draft is ready
pub trait TerminationPolicy: Send + Sync {
    fn signals_quality(&self, critique: &str) -> bool;
}

/// Case-insensitive substring match over [`STOP_PHRASES`]
///
/// Plain substring matching: "not ready to publish" also matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhraseTermination;

impl TerminationPolicy for PhraseTermination {
    fn signals_quality(&self, critique: &str) -> bool {
        let critique = critique.to_lowercase();
        STOP_PHRASES.iter().any(|phrase| critique.contains(phrase))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    QualityMet,
    IterationBudgetExhausted,
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationDecision {
    pub should_stop: bool,
    pub reason: TerminationReason,
}

impl TerminationDecision {
    /// Decide after a critique at `iteration`. Quality wins over budget.
    pub fn evaluate(
        policy: &dyn TerminationPolicy,
        critique: &str,
        iteration: u32,
        max_iterations: u32,
    ) -> Self {
        let reason = if policy.signals_quality(critique) {
            TerminationReason::QualityMet
        } else if iteration >= max_iterations {
            TerminationReason::IterationBudgetExhausted
        } else {
            TerminationReason::Continue
        };

        Self {
            should_stop: reason != TerminationReason::Continue,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrases_match_any_case() {
        let policy = PhraseTermination;
        assert!(policy.signals_quality("SCORE: 9/10, strong hook"));
        assert!(policy.signals_quality("Overall this is Ready To Publish."));
        assert!(policy.signals_quality("score: 10"));
        assert!(!policy.signals_quality("Score: 7/10, needs tightening"));
        assert!(!policy.signals_quality("score 9 without the colon"));
    }

    #[test]
    fn test_negated_phrase_still_matches() {
        assert!(PhraseTermination.signals_quality("This is not ready to publish yet"));
    }

    #[test]
    fn test_quality_takes_precedence_over_budget() {
        let decision = TerminationDecision::evaluate(&PhraseTermination, "score: 9", 3, 3);
        assert!(decision.should_stop);
        assert_eq!(decision.reason, TerminationReason::QualityMet);
    }

    #[test]
    fn test_budget_exhausted() {
        let decision = TerminationDecision::evaluate(&PhraseTermination, "score: 5", 2, 2);
        assert!(decision.should_stop);
        assert_eq!(decision.reason, TerminationReason::IterationBudgetExhausted);
    }

    #[test]
    fn test_continue() {
        let decision = TerminationDecision::evaluate(&PhraseTermination, "score: 5", 1, 2);
        assert!(!decision.should_stop);
        assert_eq!(decision.reason, TerminationReason::Continue);
    }
}
