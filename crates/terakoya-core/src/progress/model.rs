//! Persisted record models for user learning progress.
//!
//! These are the "wire" shapes both store backends round-trip. Every field
//! that can be absent in an older document carries a serde default so partial
//! prior-version records load instead of failing.

use crate::assessment::{AssessmentAttempt, AssessmentQuestion};
use crate::objective::StudyPlan;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-topic progress for one objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicProgress {
    /// Mastery level in [0.0, 1.0]
    #[serde(default)]
    pub mastery_level: f64,
    /// Whether the topic has been completed
    #[serde(default)]
    pub completed: bool,
    /// Timestamp of the last study activity (RFC 3339 format)
    #[serde(default)]
    pub last_studied: Option<String>,
}

/// A study plan as persisted.
///
/// Unlike [`StudyPlan`], every field is optional: stored documents may
/// predate one of the fields, and the session layer decides whether such a
/// plan is usable. A plan missing any field converts to `None` via
/// [`StoredPlan::into_plan`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredPlan {
    #[serde(default)]
    pub topics: Option<Vec<String>>,
    #[serde(default)]
    pub learning_path: Option<Vec<String>>,
    #[serde(default)]
    pub estimated_time: Option<HashMap<String, String>>,
    #[serde(default)]
    pub prerequisites: Option<HashMap<String, Vec<String>>>,
}

impl StoredPlan {
    /// Converts a domain plan into its persisted form.
    pub fn from_plan(plan: &StudyPlan) -> Self {
        Self {
            topics: Some(plan.topics.clone()),
            learning_path: Some(plan.learning_path.clone()),
            estimated_time: Some(plan.estimated_time.clone()),
            prerequisites: Some(plan.prerequisites.clone()),
        }
    }

    /// Converts back into a domain plan.
    ///
    /// Returns `None` when any of the four required fields is missing; a
    /// partially stored plan is treated as no plan at all.
    pub fn into_plan(self) -> Option<StudyPlan> {
        Some(StudyPlan {
            topics: self.topics?,
            learning_path: self.learning_path?,
            estimated_time: self.estimated_time?,
            prerequisites: self.prerequisites?,
        })
    }
}

/// An assessment together with its latest results, as persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    /// The topic the assessment covers
    #[serde(default)]
    pub topic: String,
    /// The questions as administered
    #[serde(default)]
    pub questions: Vec<AssessmentQuestion>,
    /// Recommended time to complete
    #[serde(default)]
    pub time_limit: Option<String>,
    /// The attempt results, absent until the user has taken the assessment
    #[serde(default)]
    pub results: Option<AssessmentAttempt>,
}

/// One learning objective with everything hanging off it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveRecord {
    /// Free-text title of the objective
    #[serde(default)]
    pub title: String,
    /// Creation timestamp (RFC 3339 format); ordering key for "most recent"
    #[serde(default)]
    pub created_at: String,
    /// Completion timestamp, set once when the objective is achieved
    #[serde(default)]
    pub completed_at: Option<String>,
    /// The current study plan, if one has been recorded
    #[serde(default)]
    pub study_plan: Option<StoredPlan>,
    /// Per-topic progress
    #[serde(default)]
    pub topic_progress: HashMap<String, TopicProgress>,
    /// Assessments keyed by assessment id
    #[serde(default)]
    pub quizzes: HashMap<String, AssessmentRecord>,
}

/// The full persisted record for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// All learning objectives keyed by objective id
    #[serde(default)]
    pub learning_objectives: HashMap<String, ObjectiveRecord>,
    /// Timestamp of the last save (RFC 3339 format)
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl UserRecord {
    /// Whether this record holds no objectives at all.
    pub fn is_empty(&self) -> bool {
        self.learning_objectives.is_empty()
    }

    /// Returns the objective with the latest `created_at`, if any.
    pub fn most_recent_objective(&self) -> Option<(&String, &ObjectiveRecord)> {
        self.learning_objectives
            .iter()
            .max_by(|a, b| a.1.created_at.cmp(&b.1.created_at))
    }

    /// Summarizes every objective for history views, most recent first.
    pub fn history_summaries(&self) -> Vec<ObjectiveSummary> {
        let mut summaries: Vec<ObjectiveSummary> = self
            .learning_objectives
            .iter()
            .map(|(id, record)| ObjectiveSummary::from_record(id, record))
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }
}

/// Aggregated view of one objective for history listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveSummary {
    pub objective_id: String,
    pub title: String,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub total_topics: usize,
    pub completed_topics: usize,
    pub average_mastery: f64,
    pub assessment_count: usize,
    pub average_score: f64,
}

impl ObjectiveSummary {
    fn from_record(id: &str, record: &ObjectiveRecord) -> Self {
        let total_topics = record.topic_progress.len();
        let completed_topics = record
            .topic_progress
            .values()
            .filter(|p| p.completed)
            .count();
        let average_mastery = if total_topics > 0 {
            record
                .topic_progress
                .values()
                .map(|p| p.mastery_level)
                .sum::<f64>()
                / total_topics as f64
        } else {
            0.0
        };

        let scores: Vec<f64> = record
            .quizzes
            .values()
            .filter_map(|q| q.results.as_ref().and_then(|r| r.score))
            .collect();
        let average_score = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };

        Self {
            objective_id: id.to_string(),
            title: record.title.clone(),
            created_at: record.created_at.clone(),
            completed_at: record.completed_at.clone(),
            total_topics,
            completed_topics,
            average_mastery,
            assessment_count: record.quizzes.len(),
            average_score,
        }
    }
}
