//! Learning objective and study plan domain models.

use crate::error::{Result, TerakoyaError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Topics used for the fallback study plan when planning produces nothing usable.
pub const DEFAULT_TOPICS: [&str; 4] = [
    "Introduction",
    "Key Concepts",
    "Applications",
    "Advanced Topics",
];

/// A user's top-level learning goal.
///
/// Immutable once created, except for the completion timestamp which is set
/// when the objective is achieved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningObjective {
    /// Unique objective identifier (UUID format)
    pub id: String,
    /// Free-text title describing the goal
    pub title: String,
    /// Timestamp when the objective was created (RFC 3339 format)
    pub created_at: String,
    /// Timestamp when the objective was completed, if it has been
    pub completed_at: Option<String>,
}

impl LearningObjective {
    /// Creates a new objective with a fresh UUID and the current timestamp.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
            completed_at: None,
        }
    }
}

/// An ordered plan of topics for one learning objective.
///
/// A plan is replaced wholesale on revision; its fields are never mutated
/// piecemeal from outside the session layer.
///
/// # Invariant
///
/// Every topic named in `learning_path` and every prerequisite topic must
/// appear in `topics`. Use [`StudyPlan::new`] or [`StudyPlan::validate`] to
/// enforce this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyPlan {
    /// All topics covered by the plan
    pub topics: Vec<String>,
    /// Ordered sequence of topics to learn
    pub learning_path: Vec<String>,
    /// Estimated time to spend on each topic (topic -> duration text)
    #[serde(default)]
    pub estimated_time: HashMap<String, String>,
    /// Prerequisites for each topic (topic -> prerequisite topics)
    #[serde(default)]
    pub prerequisites: HashMap<String, Vec<String>>,
}

impl StudyPlan {
    /// Creates a validated study plan.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `learning_path` or `prerequisites`
    /// reference a topic that is not listed in `topics`.
    pub fn new(
        topics: Vec<String>,
        learning_path: Vec<String>,
        estimated_time: HashMap<String, String>,
        prerequisites: HashMap<String, Vec<String>>,
    ) -> Result<Self> {
        let plan = Self {
            topics,
            learning_path,
            estimated_time,
            prerequisites,
        };
        plan.validate()?;
        Ok(plan)
    }

    /// Checks the topic-superset invariant.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first unknown topic found.
    pub fn validate(&self) -> Result<()> {
        for topic in &self.learning_path {
            if !self.topics.contains(topic) {
                return Err(TerakoyaError::validation(format!(
                    "learning path references unknown topic '{}'",
                    topic
                )));
            }
        }
        for (topic, prereqs) in &self.prerequisites {
            for prereq in prereqs {
                if !self.topics.contains(prereq) {
                    return Err(TerakoyaError::validation(format!(
                        "prerequisite '{}' of topic '{}' is not in the topic list",
                        prereq, topic
                    )));
                }
            }
        }
        Ok(())
    }

    /// The fixed fallback plan used whenever planning produces no usable plan.
    ///
    /// Four topics, a learning path identical to the topic list, an equal
    /// nominal duration for each topic, and no prerequisites.
    pub fn default_plan() -> Self {
        let topics: Vec<String> = DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect();
        let estimated_time = topics
            .iter()
            .map(|t| (t.clone(), "30 minutes".to_string()))
            .collect();
        Self {
            topics: topics.clone(),
            learning_path: topics,
            estimated_time,
            prerequisites: HashMap::new(),
        }
    }

    /// Returns the first topic in the learning path, if any.
    pub fn first_topic(&self) -> Option<&str> {
        self.learning_path.first().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn valid_plan_passes_validation() {
        let plan = StudyPlan::new(
            topics(&["A", "B", "C"]),
            topics(&["A", "B"]),
            HashMap::new(),
            HashMap::from([("B".to_string(), topics(&["A"]))]),
        );
        assert!(plan.is_ok());
    }

    #[test]
    fn learning_path_with_unknown_topic_is_rejected() {
        let err = StudyPlan::new(
            topics(&["A", "B"]),
            topics(&["A", "Z"]),
            HashMap::new(),
            HashMap::new(),
        )
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn prerequisite_outside_topic_list_is_rejected() {
        let err = StudyPlan::new(
            topics(&["A", "B"]),
            topics(&["A"]),
            HashMap::new(),
            HashMap::from([("A".to_string(), topics(&["Missing"]))]),
        )
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn default_plan_has_four_topics_and_no_prerequisites() {
        let plan = StudyPlan::default_plan();
        assert_eq!(plan.topics.len(), 4);
        assert_eq!(plan.topics, plan.learning_path);
        assert_eq!(plan.first_topic(), Some("Introduction"));
        assert!(plan.prerequisites.is_empty());
        assert!(plan.validate().is_ok());
        for topic in &plan.topics {
            assert_eq!(plan.estimated_time.get(topic).unwrap(), "30 minutes");
        }
    }
}
