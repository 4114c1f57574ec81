//! The session aggregate.

use crate::assessment::{Assessment, AssessmentAttempt};
use crate::error::Result;
use crate::objective::{LearningObjective, StudyPlan};
use crate::progress::{
    AssessmentRecord, ProgressRepository, StoredPlan, TopicProgress, UserRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// The latest attempt at a topic's assessment, as held in the active session.
///
/// Earlier attempts for the same topic stay in the persisted record; the
/// session view only tracks the most recent one.
#[derive(Debug, Clone)]
pub struct TopicAttempt {
    /// Stable id the attempt is persisted under
    pub quiz_id: String,
    /// The assessment as administered
    pub assessment: Assessment,
    /// User responses keyed by question index
    pub answers: HashMap<usize, String>,
    /// Timestamp when the attempt was recorded (RFC 3339 format)
    pub recorded_at: Option<String>,
}

/// Snapshot of session progress, suitable as agent input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub objective: Option<String>,
    pub current_topic: Option<String>,
    pub mastery_levels: HashMap<String, f64>,
    pub completed_topics: Vec<String>,
    pub total_topics: usize,
    pub completion_percentage: f64,
    pub average_mastery: f64,
}

/// In-memory state of one user's active learning session.
///
/// Exactly one `SessionState` exists per active session; it exclusively owns
/// the objective, plan, progress, and assessment entities for the session's
/// duration and is the sole caller of the progress store's write operations.
///
/// Every mutating operation persists the full record before returning. A
/// persistence failure is logged and the session continues in memory only;
/// it is never fatal from the session's perspective.
pub struct SessionState {
    user_id: String,
    objective_id: Option<String>,
    objective_title: Option<String>,
    study_plan: Option<StudyPlan>,
    current_topic: Option<String>,
    knowledge_source_id: Option<String>,
    mastery_levels: HashMap<String, f64>,
    completed_topics: Vec<String>,
    studied_at: HashMap<String, String>,
    attempts: HashMap<String, TopicAttempt>,
    /// Cached copy of the persisted record; the active objective's subtree is
    /// merged into it on every save so other objectives survive
    /// whole-document writes.
    record: UserRecord,
    /// Whether the cache has been primed from the store yet
    cache_loaded: bool,
    repository: Arc<dyn ProgressRepository>,
}

impl SessionState {
    /// Creates an empty session for a user.
    ///
    /// Call [`SessionState::load_most_recent_objective`] afterwards to
    /// restore prior progress.
    pub fn new(user_id: impl Into<String>, repository: Arc<dyn ProgressRepository>) -> Self {
        Self {
            user_id: user_id.into(),
            objective_id: None,
            objective_title: None,
            study_plan: None,
            current_topic: None,
            knowledge_source_id: None,
            mastery_levels: HashMap::new(),
            completed_topics: Vec::new(),
            studied_at: HashMap::new(),
            attempts: HashMap::new(),
            record: UserRecord::default(),
            cache_loaded: false,
            repository,
        }
    }

    /// Restores the most recently created objective from the store.
    ///
    /// Selects the objective with the latest `created_at`. A stored plan
    /// missing any of its four required fields fails the load ("no valid
    /// plan"): the objective id and title are restored, but no plan or
    /// progress state is populated, and the caller should fall back to
    /// [`SessionState::default_plan`].
    ///
    /// Returns `true` when an objective with a usable plan was restored.
    pub async fn load_most_recent_objective(&mut self) -> bool {
        match self.repository.load(&self.user_id).await {
            Ok(record) => {
                self.record = record;
                self.cache_loaded = true;
            }
            Err(e) => {
                tracing::warn!("Failed to load progress for user {}: {}", self.user_id, e);
                return false;
            }
        }

        let Some((id, objective)) = self
            .record
            .most_recent_objective()
            .map(|(id, obj)| (id.clone(), obj.clone()))
        else {
            return false;
        };

        self.objective_id = Some(id);
        self.objective_title = Some(objective.title.clone());

        let Some(plan) = objective.study_plan.clone().and_then(StoredPlan::into_plan) else {
            tracing::debug!(
                "Stored plan for user {} is missing required fields, treating as no plan",
                self.user_id
            );
            return false;
        };
        self.study_plan = Some(plan);

        for (topic, progress) in &objective.topic_progress {
            self.mastery_levels
                .insert(topic.clone(), progress.mastery_level);
            if progress.completed && !self.completed_topics.contains(topic) {
                self.completed_topics.push(topic.clone());
            }
            if let Some(studied) = &progress.last_studied {
                self.studied_at.insert(topic.clone(), studied.clone());
            }
        }

        for (quiz_id, quiz) in &objective.quizzes {
            let recorded_at = quiz
                .results
                .as_ref()
                .and_then(|r| r.recorded_at.clone());
            let replace = match self.attempts.get(&quiz.topic) {
                Some(existing) => recorded_at > existing.recorded_at,
                None => true,
            };
            if replace {
                self.attempts.insert(
                    quiz.topic.clone(),
                    TopicAttempt {
                        quiz_id: quiz_id.clone(),
                        assessment: Assessment {
                            topic: quiz.topic.clone(),
                            questions: quiz.questions.clone(),
                            time_limit: quiz
                                .time_limit
                                .clone()
                                .unwrap_or_else(|| "10 minutes".to_string()),
                        },
                        answers: quiz
                            .results
                            .as_ref()
                            .map(|r| r.answers.clone())
                            .unwrap_or_default(),
                        recorded_at,
                    },
                );
            }
        }

        true
    }

    /// The fixed fallback plan used whenever planning produces nothing usable.
    pub fn default_plan() -> StudyPlan {
        StudyPlan::default_plan()
    }

    /// Installs the fallback plan in the session without persisting it.
    ///
    /// The plan reaches the store with the next mutating operation.
    pub fn install_default_plan(&mut self) -> &StudyPlan {
        self.study_plan = Some(StudyPlan::default_plan());
        self.study_plan.as_ref().unwrap()
    }

    /// Records a new study plan for the active objective.
    ///
    /// Validates the topic-superset invariant, assigns a fresh objective id
    /// if none is active, and persists immediately.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the plan references unknown topics;
    /// the session is left unchanged in that case.
    pub async fn record_study_plan(&mut self, plan: StudyPlan) -> Result<()> {
        plan.validate()?;

        if self.objective_id.is_none() {
            let objective =
                LearningObjective::new(self.objective_title.clone().unwrap_or_default());
            self.record.learning_objectives.insert(
                objective.id.clone(),
                crate::progress::ObjectiveRecord {
                    title: objective.title.clone(),
                    created_at: objective.created_at.clone(),
                    ..Default::default()
                },
            );
            self.objective_id = Some(objective.id);
        }

        self.study_plan = Some(plan);
        self.persist().await;
        Ok(())
    }

    /// Records an attempt at an assessment.
    ///
    /// The attempt is keyed by topic in the session view (latest wins) while
    /// each attempt gets its own entry in the store, so full history
    /// accumulates there. Computes no mastery; persists immediately.
    pub async fn record_attempt(
        &mut self,
        assessment: Assessment,
        answers: HashMap<usize, String>,
    ) {
        let topic = assessment.topic.clone();
        self.current_topic = Some(topic.clone());

        let quiz_id = format!("{}_{}_{}", self.user_id, topic, uuid::Uuid::new_v4());
        self.attempts.insert(
            topic,
            TopicAttempt {
                quiz_id,
                assessment,
                answers,
                recorded_at: Some(chrono::Utc::now().to_rfc3339()),
            },
        );
        self.persist().await;
    }

    /// Records the mastery level for a topic.
    ///
    /// Overwrites any previous level (the latest attempt fully supersedes
    /// earlier mastery). When `completed` is true the topic joins the
    /// completed list with set semantics. Persists immediately.
    pub async fn record_mastery(&mut self, topic: &str, level: f64, completed: bool) {
        self.mastery_levels.insert(topic.to_string(), level);
        self.studied_at
            .insert(topic.to_string(), chrono::Utc::now().to_rfc3339());
        if completed && !self.completed_topics.iter().any(|t| t == topic) {
            self.completed_topics.push(topic.to_string());
        }
        self.persist().await;
    }

    /// Marks the active objective as complete.
    ///
    /// Sets the completion timestamp and persists. No-op when no objective is
    /// active.
    pub async fn mark_objective_complete(&mut self) {
        let Some(objective_id) = self.objective_id.clone() else {
            return;
        };
        if let Some(objective) = self.record.learning_objectives.get_mut(&objective_id) {
            objective.completed_at = Some(chrono::Utc::now().to_rfc3339());
        }
        self.persist().await;
    }

    /// Builds a progress snapshot for agents and history views.
    pub fn progress_report(&self) -> ProgressReport {
        let total_topics = self
            .study_plan
            .as_ref()
            .map(|p| p.topics.len())
            .unwrap_or(0);
        let completion_percentage = if total_topics > 0 {
            self.completed_topics.len() as f64 / total_topics as f64 * 100.0
        } else {
            0.0
        };
        let average_mastery = if self.mastery_levels.is_empty() {
            0.0
        } else {
            self.mastery_levels.values().sum::<f64>() / self.mastery_levels.len() as f64
        };

        ProgressReport {
            objective: self.objective_title.clone(),
            current_topic: self.current_topic.clone(),
            mastery_levels: self.mastery_levels.clone(),
            completed_topics: self.completed_topics.clone(),
            total_topics,
            completion_percentage,
            average_mastery,
        }
    }

    /// Sets the objective title for the session.
    ///
    /// Keeps the active objective if one was restored (its plan is then
    /// replaced wholesale on the next [`SessionState::record_study_plan`]);
    /// otherwise the id is assigned when the first plan is recorded.
    pub fn set_objective(&mut self, title: impl Into<String>) {
        self.objective_title = Some(title.into());
    }

    /// Begins a brand-new objective, detaching from any restored one.
    ///
    /// Clears all per-objective session state; a fresh objective id is
    /// assigned when the next plan is recorded. The previous objective stays
    /// untouched in the store.
    pub fn start_objective(&mut self, title: impl Into<String>) {
        self.objective_id = None;
        self.objective_title = Some(title.into());
        self.study_plan = None;
        self.current_topic = None;
        self.mastery_levels.clear();
        self.completed_topics.clear();
        self.studied_at.clear();
        self.attempts.clear();
    }

    /// Stores the opaque knowledge-source handle for this session.
    pub fn set_knowledge_source(&mut self, id: impl Into<String>) {
        self.knowledge_source_id = Some(id.into());
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn objective_id(&self) -> Option<&str> {
        self.objective_id.as_deref()
    }

    pub fn objective_title(&self) -> Option<&str> {
        self.objective_title.as_deref()
    }

    pub fn study_plan(&self) -> Option<&StudyPlan> {
        self.study_plan.as_ref()
    }

    pub fn current_topic(&self) -> Option<&str> {
        self.current_topic.as_deref()
    }

    pub fn knowledge_source(&self) -> Option<&str> {
        self.knowledge_source_id.as_deref()
    }

    pub fn mastery_levels(&self) -> &HashMap<String, f64> {
        &self.mastery_levels
    }

    pub fn completed_topics(&self) -> &[String] {
        &self.completed_topics
    }

    pub fn attempt_for(&self, topic: &str) -> Option<&TopicAttempt> {
        self.attempts.get(topic)
    }

    /// Merges the active objective's subtree into the cached record.
    fn sync_record(&mut self) {
        let Some(objective_id) = self.objective_id.clone() else {
            return;
        };
        let entry = self
            .record
            .learning_objectives
            .entry(objective_id)
            .or_default();

        if let Some(title) = &self.objective_title {
            entry.title = title.clone();
        }
        if entry.created_at.is_empty() {
            entry.created_at = chrono::Utc::now().to_rfc3339();
        }
        if let Some(plan) = &self.study_plan {
            entry.study_plan = Some(StoredPlan::from_plan(plan));
        }

        let mut topics: Vec<String> = self
            .study_plan
            .as_ref()
            .map(|p| p.topics.clone())
            .unwrap_or_default();
        for topic in self.mastery_levels.keys() {
            if !topics.contains(topic) {
                topics.push(topic.clone());
            }
        }
        for topic in topics {
            let progress = TopicProgress {
                mastery_level: self.mastery_levels.get(&topic).copied().unwrap_or(0.0),
                completed: self.completed_topics.contains(&topic),
                last_studied: self.studied_at.get(&topic).cloned(),
            };
            entry.topic_progress.insert(topic, progress);
        }

        for (topic, attempt) in &self.attempts {
            entry.quizzes.insert(
                attempt.quiz_id.clone(),
                AssessmentRecord {
                    topic: topic.clone(),
                    questions: attempt.assessment.questions.clone(),
                    time_limit: Some(attempt.assessment.time_limit.clone()),
                    results: Some(AssessmentAttempt {
                        answers: attempt.answers.clone(),
                        score: self.mastery_levels.get(topic).copied(),
                        strengths: Vec::new(),
                        weaknesses: Vec::new(),
                        recorded_at: attempt.recorded_at.clone(),
                    }),
                },
            );
        }
    }

    /// Persists the full record. Failures are logged and the session keeps
    /// running in memory only.
    async fn persist(&mut self) -> bool {
        // Prime the cache from the store before the first write so objectives
        // this session never touched survive the whole-document save.
        if !self.cache_loaded {
            match self.repository.load(&self.user_id).await {
                Ok(existing) => {
                    for (id, objective) in existing.learning_objectives {
                        self.record.learning_objectives.entry(id).or_insert(objective);
                    }
                    self.cache_loaded = true;
                }
                Err(e) => {
                    tracing::debug!(
                        "Could not prime progress cache for user {}: {}",
                        self.user_id,
                        e
                    );
                }
            }
        }

        self.sync_record();
        match self.repository.save(&self.user_id, &self.record).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    "Failed to persist progress for user {}, continuing in memory: {}",
                    self.user_id,
                    e
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TerakoyaError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    // Mock ProgressRepository backed by a shared map
    struct MockProgressRepository {
        records: Mutex<HashMap<String, UserRecord>>,
    }

    impl MockProgressRepository {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                records: Mutex::new(HashMap::new()),
            })
        }

        fn stored(&self, user_id: &str) -> Option<UserRecord> {
            self.records.lock().unwrap().get(user_id).cloned()
        }
    }

    #[async_trait]
    impl ProgressRepository for MockProgressRepository {
        async fn save(&self, user_id: &str, record: &UserRecord) -> Result<()> {
            self.records
                .lock()
                .unwrap()
                .insert(user_id.to_string(), record.clone());
            Ok(())
        }

        async fn load(&self, user_id: &str) -> Result<UserRecord> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .get(user_id)
                .cloned()
                .unwrap_or_default())
        }
    }

    // Repository whose saves always fail
    struct FailingRepository;

    #[async_trait]
    impl ProgressRepository for FailingRepository {
        async fn save(&self, _user_id: &str, _record: &UserRecord) -> Result<()> {
            Err(TerakoyaError::data_access("store unavailable"))
        }

        async fn load(&self, _user_id: &str) -> Result<UserRecord> {
            Err(TerakoyaError::data_access("store unavailable"))
        }
    }

    async fn session_with_plan(
        repository: Arc<MockProgressRepository>,
    ) -> SessionState {
        let mut session = SessionState::new("user-1", repository);
        session.set_objective("Learn Rust");
        session
            .record_study_plan(StudyPlan::default_plan())
            .await
            .unwrap();
        session
    }

    #[tokio::test]
    async fn record_mastery_round_trips_through_store() {
        let repository = MockProgressRepository::new();
        let mut session = session_with_plan(repository.clone()).await;

        session.record_mastery("Key Concepts", 0.85, true).await;

        let mut fresh = SessionState::new("user-1", repository);
        assert!(fresh.load_most_recent_objective().await);
        assert_eq!(
            fresh.mastery_levels().get("Key Concepts").copied(),
            Some(0.85)
        );
        assert_eq!(fresh.completed_topics(), ["Key Concepts"]);
    }

    #[tokio::test]
    async fn completed_topics_have_set_semantics() {
        let repository = MockProgressRepository::new();
        let mut session = session_with_plan(repository).await;

        session.record_mastery("Applications", 0.9, true).await;
        session.record_mastery("Applications", 0.95, true).await;

        assert_eq!(session.completed_topics(), ["Applications"]);
    }

    #[tokio::test]
    async fn record_study_plan_assigns_objective_id_and_persists() {
        let repository = MockProgressRepository::new();
        let session = session_with_plan(repository.clone()).await;

        let objective_id = session.objective_id().unwrap().to_string();
        let stored = repository.stored("user-1").unwrap();
        let objective = &stored.learning_objectives[&objective_id];
        assert_eq!(objective.title, "Learn Rust");
        assert!(objective.study_plan.is_some());
    }

    #[tokio::test]
    async fn record_study_plan_rejects_invalid_plan() {
        let repository = MockProgressRepository::new();
        let mut session = SessionState::new("user-1", repository.clone());

        let bad_plan = StudyPlan {
            topics: vec!["A".to_string()],
            learning_path: vec!["A".to_string(), "Unknown".to_string()],
            estimated_time: HashMap::new(),
            prerequisites: HashMap::new(),
        };
        let err = session.record_study_plan(bad_plan).await.unwrap_err();
        assert!(err.is_validation());
        assert!(session.study_plan().is_none());
        assert!(repository.stored("user-1").is_none());
    }

    #[tokio::test]
    async fn load_picks_most_recently_created_objective() {
        let repository = MockProgressRepository::new();
        let mut record = UserRecord::default();
        for (id, created_at, title) in [
            ("obj-old", "2024-01-01T00:00:00Z", "Old"),
            ("obj-new", "2024-06-01T00:00:00Z", "New"),
        ] {
            record.learning_objectives.insert(
                id.to_string(),
                crate::progress::ObjectiveRecord {
                    title: title.to_string(),
                    created_at: created_at.to_string(),
                    study_plan: Some(StoredPlan::from_plan(&StudyPlan::default_plan())),
                    ..Default::default()
                },
            );
        }
        repository.save("user-1", &record).await.unwrap();

        let mut session = SessionState::new("user-1", repository);
        assert!(session.load_most_recent_objective().await);
        assert_eq!(session.objective_id(), Some("obj-new"));
        assert_eq!(session.objective_title(), Some("New"));
    }

    #[tokio::test]
    async fn stored_plan_missing_field_fails_the_load() {
        let repository = MockProgressRepository::new();
        let mut record = UserRecord::default();
        record.learning_objectives.insert(
            "obj-1".to_string(),
            crate::progress::ObjectiveRecord {
                title: "Partial".to_string(),
                created_at: "2024-01-01T00:00:00Z".to_string(),
                study_plan: Some(StoredPlan {
                    topics: Some(vec!["A".to_string()]),
                    learning_path: Some(vec!["A".to_string()]),
                    estimated_time: None, // missing required field
                    prerequisites: Some(HashMap::new()),
                }),
                ..Default::default()
            },
        );
        repository.save("user-1", &record).await.unwrap();

        let mut session = SessionState::new("user-1", repository);
        assert!(!session.load_most_recent_objective().await);
        assert!(session.study_plan().is_none());

        // Caller falls back to the fixed default plan
        let plan = session.install_default_plan().clone();
        assert_eq!(
            plan.topics,
            ["Introduction", "Key Concepts", "Applications", "Advanced Topics"]
        );
    }

    #[tokio::test]
    async fn attempt_history_accumulates_in_the_store() {
        let repository = MockProgressRepository::new();
        let mut session = session_with_plan(repository.clone()).await;

        let assessment = Assessment {
            topic: "Introduction".to_string(),
            questions: Vec::new(),
            time_limit: "5 minutes".to_string(),
        };
        session
            .record_attempt(assessment.clone(), HashMap::from([(0, "A".to_string())]))
            .await;
        session
            .record_attempt(assessment, HashMap::from([(0, "B".to_string())]))
            .await;

        // Session view keeps only the latest attempt
        let latest = session.attempt_for("Introduction").unwrap();
        assert_eq!(latest.answers[&0], "B");

        // The store accumulates both
        let stored = repository.stored("user-1").unwrap();
        let objective_id = session.objective_id().unwrap();
        assert_eq!(stored.learning_objectives[objective_id].quizzes.len(), 2);
    }

    #[tokio::test]
    async fn mark_objective_complete_is_noop_without_objective() {
        let repository = MockProgressRepository::new();
        let mut session = SessionState::new("user-1", repository.clone());

        session.mark_objective_complete().await;
        assert!(repository.stored("user-1").is_none());
    }

    #[tokio::test]
    async fn mark_objective_complete_sets_timestamp() {
        let repository = MockProgressRepository::new();
        let mut session = session_with_plan(repository.clone()).await;

        session.mark_objective_complete().await;

        let stored = repository.stored("user-1").unwrap();
        let objective_id = session.objective_id().unwrap();
        assert!(
            stored.learning_objectives[objective_id]
                .completed_at
                .is_some()
        );
    }

    #[tokio::test]
    async fn other_objectives_survive_a_save() {
        let repository = MockProgressRepository::new();
        let mut record = UserRecord::default();
        record.learning_objectives.insert(
            "obj-earlier".to_string(),
            crate::progress::ObjectiveRecord {
                title: "Earlier goal".to_string(),
                created_at: "2023-01-01T00:00:00Z".to_string(),
                ..Default::default()
            },
        );
        repository.save("user-1", &record).await.unwrap();

        let mut session = SessionState::new("user-1", repository.clone());
        assert!(!session.load_most_recent_objective().await); // earlier goal has no plan
        session.start_objective("New goal");
        session
            .record_study_plan(StudyPlan::default_plan())
            .await
            .unwrap();

        let stored = repository.stored("user-1").unwrap();
        assert_eq!(stored.learning_objectives.len(), 2);
        assert!(stored.learning_objectives.contains_key("obj-earlier"));
    }

    #[tokio::test]
    async fn saving_without_prior_load_still_preserves_stored_objectives() {
        let repository = MockProgressRepository::new();
        let mut record = UserRecord::default();
        record.learning_objectives.insert(
            "obj-earlier".to_string(),
            crate::progress::ObjectiveRecord {
                title: "Earlier goal".to_string(),
                created_at: "2023-01-01T00:00:00Z".to_string(),
                ..Default::default()
            },
        );
        repository.save("user-1", &record).await.unwrap();

        // A session that never restored still must not clobber the record
        let mut session = SessionState::new("user-1", repository.clone());
        session.set_objective("New goal");
        session
            .record_study_plan(StudyPlan::default_plan())
            .await
            .unwrap();

        let stored = repository.stored("user-1").unwrap();
        assert_eq!(stored.learning_objectives.len(), 2);
    }

    #[tokio::test]
    async fn persistence_failure_degrades_without_losing_memory_state() {
        let mut session = SessionState::new("user-1", Arc::new(FailingRepository));
        session.set_objective("Degraded");
        session
            .record_study_plan(StudyPlan::default_plan())
            .await
            .unwrap();
        session.record_mastery("Introduction", 0.4, false).await;

        assert_eq!(
            session.mastery_levels().get("Introduction").copied(),
            Some(0.4)
        );
    }

    #[tokio::test]
    async fn progress_report_summarizes_session() {
        let repository = MockProgressRepository::new();
        let mut session = session_with_plan(repository).await;
        session.record_mastery("Introduction", 0.8, true).await;
        session.record_mastery("Key Concepts", 0.6, false).await;

        let report = session.progress_report();
        assert_eq!(report.total_topics, 4);
        assert_eq!(report.completed_topics, ["Introduction"]);
        assert!((report.completion_percentage - 25.0).abs() < 1e-9);
        assert!((report.average_mastery - 0.7).abs() < 1e-9);
    }
}
