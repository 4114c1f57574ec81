//! Assessment and attempt domain models.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as FmtWrite;

/// Difficulty tier of a single question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

/// One question within an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentQuestion {
    /// The question text
    pub text: String,
    /// The correct answer or expected response
    pub correct_answer: String,
    /// Explanation of why the answer is correct
    pub explanation: String,
    /// Difficulty tier
    #[serde(default)]
    pub difficulty: Difficulty,
    /// For multiple choice, the list of options; `None` for open-ended
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

/// A quiz covering one topic.
///
/// Immutable once created; a revised quiz is a new entity, never an edit in
/// place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// The topic this assessment covers
    pub topic: String,
    /// Ordered list of questions
    #[serde(default)]
    pub questions: Vec<AssessmentQuestion>,
    /// Recommended time to complete, e.g. "10 minutes"
    pub time_limit: String,
}

impl Assessment {
    /// Renders the questions as a numbered text block, suitable as input for
    /// the evaluating agent.
    pub fn questions_text(&self) -> String {
        let mut out = String::new();
        for (i, question) in self.questions.iter().enumerate() {
            let _ = writeln!(out, "Question {}: {}", i + 1, question.text);
            if let Some(options) = &question.options {
                for (j, option) in options.iter().enumerate() {
                    let letter = (b'A' + j as u8) as char;
                    let _ = writeln!(out, "  {}. {}", letter, option);
                }
            }
        }
        out
    }
}

/// One user attempt at an assessment.
///
/// Appended to history exactly once per attempt, never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentAttempt {
    /// User responses keyed by question index
    #[serde(default)]
    pub answers: HashMap<usize, String>,
    /// Score as a decimal between 0.0 and 1.0, once evaluated
    #[serde(default)]
    pub score: Option<f64>,
    /// Concepts the user showed strength in
    #[serde(default)]
    pub strengths: Vec<String>,
    /// Concepts the user needs to improve on
    #[serde(default)]
    pub weaknesses: Vec<String>,
    /// Timestamp when the attempt was recorded (RFC 3339 format)
    #[serde(default)]
    pub recorded_at: Option<String>,
}

impl AssessmentAttempt {
    /// Creates an unevaluated attempt from raw answers, stamped now.
    pub fn from_answers(answers: HashMap<usize, String>) -> Self {
        Self {
            answers,
            score: None,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            recorded_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }
}
