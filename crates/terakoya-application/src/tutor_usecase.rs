//! Tutoring use case implementation.
//!
//! `TutorUseCase` coordinates the session state, the handoff engine, and the
//! knowledge ingestor for one user's learning session. Presentation layers
//! talk to this type and pass the session handle explicitly; there is no
//! ambient registry of active sessions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use terakoya_core::assessment::Assessment;
use terakoya_core::config::StorageConfig;
use terakoya_core::error::{Result, TerakoyaError};
use terakoya_core::handoff::{AgentRole, AgentRunner, ChainOutcome, HandoffBudget, HandoffEngine};
use terakoya_core::knowledge::KnowledgeIngestor;
use terakoya_core::progress::ProgressRepository;
use terakoya_core::session::SessionState;
use terakoya_infrastructure::open_progress_repository;

/// Drives one user's learning session end to end.
///
/// # Responsibilities
///
/// - Restoring prior progress at session start
/// - Setting up the knowledge source agents read from
/// - Kicking off planning, teaching, and evaluation chains
/// - Falling back to the fixed default plan when planning yields nothing
///   usable
pub struct TutorUseCase {
    session: SessionState,
    engine: HandoffEngine,
    ingestor: Arc<dyn KnowledgeIngestor>,
}

impl TutorUseCase {
    /// Creates a use case with default chain budgets.
    ///
    /// # Arguments
    ///
    /// * `user_id` - Unique identifier for the user
    /// * `repository` - Progress store backend
    /// * `runner` - Agent invocation backend
    /// * `ingestor` - Knowledge ingestion backend
    pub fn new(
        user_id: impl Into<String>,
        repository: Arc<dyn ProgressRepository>,
        runner: Arc<dyn AgentRunner>,
        ingestor: Arc<dyn KnowledgeIngestor>,
    ) -> Self {
        Self::with_budget(user_id, repository, runner, ingestor, HandoffBudget::default())
    }

    /// Creates a use case with explicit chain budgets.
    pub fn with_budget(
        user_id: impl Into<String>,
        repository: Arc<dyn ProgressRepository>,
        runner: Arc<dyn AgentRunner>,
        ingestor: Arc<dyn KnowledgeIngestor>,
        budget: HandoffBudget,
    ) -> Self {
        Self {
            session: SessionState::new(user_id, repository),
            engine: HandoffEngine::with_budget(runner, budget),
            ingestor,
        }
    }

    /// Creates a use case with the store backend the configuration selects.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured backend cannot be opened.
    pub fn from_config(
        user_id: impl Into<String>,
        config: &StorageConfig,
        runner: Arc<dyn AgentRunner>,
        ingestor: Arc<dyn KnowledgeIngestor>,
    ) -> Result<Self> {
        let repository = open_progress_repository(config)?;
        Ok(Self::new(user_id, repository, runner, ingestor))
    }

    /// Restores the user's most recent objective from the store.
    ///
    /// Returns `true` when an objective with a usable plan was restored.
    pub async fn resume(&mut self) -> bool {
        self.session.load_most_recent_objective().await
    }

    /// Ingests reference documents and stores the knowledge-source handle on
    /// the session.
    ///
    /// # Errors
    ///
    /// Ingestion failure is a hard failure: the session cannot proceed
    /// without its reference material.
    pub async fn setup_knowledge_base(&mut self, paths: &[PathBuf]) -> Result<String> {
        let source_id = self.ingestor.ingest(paths).await?;
        self.session.set_knowledge_source(source_id.clone());
        tracing::info!("Knowledge source {} ready", source_id);
        Ok(source_id)
    }

    /// Runs a planning chain for a learning objective.
    ///
    /// The planner records its plan through the session; control may then
    /// hand off to the instructor. When an objective was restored earlier its
    /// plan is revised in place, otherwise a fresh objective is created when
    /// the plan is recorded.
    ///
    /// # Errors
    ///
    /// Propagates agent invocation failures.
    pub async fn create_study_plan(&mut self, objective: &str) -> Result<ChainOutcome> {
        self.session.set_objective(objective);
        tracing::info!("Creating study plan for objective: {}", objective);

        let input = format!(
            "Create a study plan for the learning objective: {objective}\n\n\
             Use the available reference materials to identify the key concepts and \
             topics that should be covered to master this subject.\n\n\
             The study plan should include:\n\
             - A comprehensive list of topics to learn\n\
             - A logical learning path that orders topics from basic to advanced\n\
             - Estimated time needed for each topic\n\
             - Prerequisites for each topic where applicable\n\n\
             After creating the plan, hand off to the Instructor to begin teaching \
             the first topic in the learning path."
        );

        self.engine
            .run_chain(AgentRole::Planner, input, &mut self.session)
            .await
    }

    /// Runs the full learning chain for the active objective.
    ///
    /// Substitutes the fixed default plan when no usable plan is present, so
    /// the chain can always proceed.
    ///
    /// # Errors
    ///
    /// Returns a validation error when no objective has been set, and
    /// propagates agent invocation failures.
    pub async fn run_learning_session(&mut self) -> Result<ChainOutcome> {
        let Some(objective) = self.session.objective_title().map(String::from) else {
            return Err(TerakoyaError::validation(
                "no learning objective set; create a study plan first",
            ));
        };

        if self.session.study_plan().is_none() {
            tracing::warn!("No usable study plan, falling back to the default plan");
            self.session.install_default_plan();
        }
        let Some(plan) = self.session.study_plan() else {
            return Err(TerakoyaError::internal("no study plan available"));
        };
        let first_topic = plan.first_topic().unwrap_or("Introduction").to_string();
        let topics = plan.topics.join(", ");
        let learning_path = plan.learning_path.join(", ");

        tracing::info!("Starting learning session for objective: {}", objective);

        let input = format!(
            "You are starting a new learning session for: {objective}.\n\n\
             Study Plan:\n\
             - Topics: {topics}\n\
             - Learning Path: {learning_path}\n\n\
             Begin by handing off to the Instructor to teach the first topic in the \
             learning path: {first_topic}.\n\
             In your handoff, explicitly specify that the Instructor should teach \
             the topic: \"{first_topic}\"."
        );

        self.engine
            .run_chain(AgentRole::Planner, input, &mut self.session)
            .await
    }

    /// Records an attempt and runs an evaluation chain over it.
    ///
    /// The evaluator scores the answers and records mastery through the
    /// session; control then typically hands back to the planner to update
    /// the learning path.
    ///
    /// # Errors
    ///
    /// Propagates agent invocation failures.
    pub async fn evaluate_attempt(
        &mut self,
        assessment: Assessment,
        answers: HashMap<usize, String>,
    ) -> Result<ChainOutcome> {
        let topic = assessment.topic.clone();
        let questions_text = assessment.questions_text();

        let mut answer_lines: Vec<(usize, &String)> =
            answers.iter().map(|(i, a)| (*i, a)).collect();
        answer_lines.sort_by_key(|(i, _)| *i);
        let answers_text = answer_lines
            .iter()
            .map(|(i, answer)| format!("Question {}: {}", i + 1, answer))
            .collect::<Vec<_>>()
            .join("\n");

        self.session.record_attempt(assessment, answers).await;
        tracing::info!("Evaluating attempt for topic: {}", topic);

        let input = format!(
            "Evaluate the following quiz responses for the topic: {topic}\n\n\
             Quiz Questions:\n{questions_text}\n\
             User Answers:\n{answers_text}\n\n\
             Evaluate each answer carefully, provide feedback, calculate the score, \
             and record the student's mastery level.\n\n\
             Then hand off to the Planner to update the study plan based on these \
             results."
        );

        self.engine
            .run_chain(AgentRole::AssessmentEvaluator, input, &mut self.session)
            .await
    }

    /// Read access to the session for presentation layers.
    pub fn session(&self) -> &SessionState {
        &self.session
    }
}
