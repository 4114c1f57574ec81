//! Mastery policy.
//!
//! Maps an assessment score to a completion flag and a progression
//! recommendation. The policy is a pure function: it is evaluated fresh on
//! every attempt and never blends with prior scores, so the latest attempt
//! fully supersedes earlier mastery for a topic.

use serde::{Deserialize, Serialize};

/// Score at or above which a topic counts as mastered.
pub const MASTERY_THRESHOLD: f64 = 0.7;

/// What the learner should do next for the assessed topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Progression {
    /// Move on to the next topic in the learning path
    Advance,
    /// Revisit the topic before moving on
    Revisit,
}

/// The outcome of applying the mastery policy to one score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MasteryDecision {
    /// Whether the topic counts as completed
    pub completed: bool,
    /// Recommended next step for the planning agent
    pub progression: Progression,
}

/// Applies the fixed mastery threshold to an assessment score.
pub fn decide(score: f64) -> MasteryDecision {
    let completed = score >= MASTERY_THRESHOLD;
    MasteryDecision {
        completed,
        progression: if completed {
            Progression::Advance
        } else {
            Progression::Revisit
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        assert!(!decide(0.0).completed);
        assert!(!decide(0.69).completed);
        assert!(decide(0.7).completed);
        assert!(decide(1.0).completed);
    }

    #[test]
    fn progression_follows_completion() {
        assert_eq!(decide(0.5).progression, Progression::Revisit);
        assert_eq!(decide(0.9).progression, Progression::Advance);
    }
}
