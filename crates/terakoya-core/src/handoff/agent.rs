//! Agent identities and the injected invocation capability.

use crate::error::Result;
use crate::session::SessionState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The specialized agent roles a learning session hands control between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Creates and revises the study plan
    Planner,
    /// Teaches the current topic
    Instructor,
    /// Designs an assessment for the taught topic
    AssessmentCreator,
    /// Scores an attempt and reports strengths and weaknesses
    AssessmentEvaluator,
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentRole::Planner => "Planner",
            AgentRole::Instructor => "Instructor",
            AgentRole::AssessmentCreator => "Assessment Creator",
            AgentRole::AssessmentEvaluator => "Assessment Evaluator",
        };
        write!(f, "{}", name)
    }
}

/// The result of one agent invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentReply {
    /// The agent's full response text
    pub raw_text: String,
    /// Structured output, when the agent produced one (opaque to the engine)
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    /// The role the agent hands control to, if any
    #[serde(default)]
    pub next_agent: Option<AgentRole>,
    /// The message to pass to the next agent; the raw text is used when absent
    #[serde(default)]
    pub handoff_message: Option<String>,
}

/// An abstract runner for agent invocations.
///
/// The real implementation wraps a multi-agent reasoning backend; tests use
/// deterministic fakes that deliberately cycle, exhaust budgets, or complete.
/// The engine passes `max_turns` through opaquely; it bounds the agent's
/// internal reasoning, not the chain.
///
/// Agents act on session state through the methods of [`SessionState`]; the
/// mutable borrow is the only channel they get.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Invokes one agent and returns its reply.
    ///
    /// # Arguments
    ///
    /// * `role` - Which agent to invoke
    /// * `input` - The input transcript for this invocation
    /// * `session` - The shared session state
    /// * `max_turns` - Budget for the agent's internal reasoning turns
    ///
    /// # Errors
    ///
    /// Invocation failure is a hard failure; the chain cannot proceed.
    async fn invoke(
        &self,
        role: AgentRole,
        input: &str,
        session: &mut SessionState,
        max_turns: u32,
    ) -> Result<AgentReply>;
}
