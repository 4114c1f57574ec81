//! Assessment domain module.
//!
//! This module contains the quiz-style assessment models: the assessment
//! itself (immutable once created) and a user's attempt at it.
//!
//! # Module Structure
//!
//! - `model`: Core domain models (`Assessment`, `AssessmentQuestion`,
//!   `AssessmentAttempt`, `Difficulty`)

mod model;

pub use model::{Assessment, AssessmentAttempt, AssessmentQuestion, Difficulty};
