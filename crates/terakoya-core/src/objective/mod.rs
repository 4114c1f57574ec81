//! Learning objective domain module.
//!
//! This module contains the learning objective and study plan models that
//! describe what a user is working toward and in which order.
//!
//! # Module Structure
//!
//! - `model`: Core domain models (`LearningObjective`, `StudyPlan`)
//!
//! # Usage
//!
//! ```ignore
//! use terakoya_core::objective::{LearningObjective, StudyPlan};
//! ```

mod model;

pub use model::{DEFAULT_TOPICS, LearningObjective, StudyPlan};
