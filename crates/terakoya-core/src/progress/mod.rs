//! User progress module.
//!
//! This module contains the backend-agnostic persisted record shape for a
//! user's learning history and the repository trait both store backends
//! implement.
//!
//! # Module Structure
//!
//! - `model`: Persisted record models (`UserRecord`, `ObjectiveRecord`,
//!   `StoredPlan`, `TopicProgress`, `AssessmentRecord`, `ObjectiveSummary`)
//! - `repository`: Repository trait for progress persistence
//!   (`ProgressRepository`)

mod model;
mod repository;

pub use model::{
    AssessmentRecord, ObjectiveRecord, ObjectiveSummary, StoredPlan, TopicProgress, UserRecord,
};
pub use repository::ProgressRepository;
