//! The handoff chain executor.

use super::agent::{AgentReply, AgentRole, AgentRunner};
use crate::error::Result;
use crate::session::SessionState;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Marker an agent emits in its reply text to signal that the learning
/// objective has been achieved.
pub const COMPLETION_MARKER: &str = "LEARNING_COMPLETE";

/// Budgets bounding a handoff chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffBudget {
    /// Reasoning-turn budget for each individual agent invocation
    pub max_turns: u32,
    /// Maximum number of invocations in one chain
    pub max_hops: u32,
}

impl Default for HandoffBudget {
    fn default() -> Self {
        Self {
            max_turns: 10,
            max_hops: 16,
        }
    }
}

/// Why a chain stopped.
///
/// None of these are errors: runaway chains are an expected adversarial case
/// and surface as a normal terminal state with partial results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaltReason {
    /// An invocation declared no next agent
    NoNextAgent,
    /// A reply contained the completion marker
    CompletionMarker,
    /// The declared next agent was already visited in this chain
    CycleDetected,
    /// The chain's hop budget ran out
    HopBudgetExhausted,
    /// The chain was cancelled between hops
    Cancelled,
}

/// One completed hop of a chain.
#[derive(Debug, Clone)]
pub struct HandoffStep {
    /// The role that was invoked
    pub role: AgentRole,
    /// What it returned
    pub reply: AgentReply,
}

/// The result of running a chain to its terminal state.
#[derive(Debug, Clone, Default)]
pub struct ChainOutcome {
    /// Every invocation result, in chain order
    pub steps: Vec<HandoffStep>,
    /// Whether the completion marker was seen
    pub completed: bool,
    /// Why the chain stopped
    pub halt: Option<HaltReason>,
}

/// Executes handoff chains strictly sequentially.
///
/// Each invocation's reply may name the next agent and the engine follows it,
/// but two safety properties hold regardless of what agents request:
///
/// 1. **Cycle guard** - revisiting an agent identity already seen in the
///    current chain halts it. The guard is identity-based, not content-based:
///    two consecutive visits to the same role always trip it.
/// 2. **Hop budget** - the chain stops once [`HandoffBudget::max_hops`]
///    invocations have run, returning whatever accumulated.
///
/// The engine never mutates session state itself, with one exception: when a
/// reply carries the completion marker it calls
/// [`SessionState::mark_objective_complete`] before returning.
pub struct HandoffEngine {
    runner: Arc<dyn AgentRunner>,
    budget: HandoffBudget,
    cancel: CancellationToken,
}

impl HandoffEngine {
    /// Creates an engine with default budgets.
    pub fn new(runner: Arc<dyn AgentRunner>) -> Self {
        Self::with_budget(runner, HandoffBudget::default())
    }

    /// Creates an engine with explicit budgets.
    pub fn with_budget(runner: Arc<dyn AgentRunner>, budget: HandoffBudget) -> Self {
        Self {
            runner,
            budget,
            cancel: CancellationToken::new(),
        }
    }

    /// Attaches a cancellation token, checked between hops.
    ///
    /// Cancellation never interrupts an in-flight invocation; a cancelled
    /// chain is a partial result set, never a partially applied mutation.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn budget(&self) -> HandoffBudget {
        self.budget
    }

    /// Runs a chain starting from the given role until it terminates.
    ///
    /// # Arguments
    ///
    /// * `start` - The first agent to invoke
    /// * `input` - Input transcript for the first invocation
    /// * `session` - The session the chain operates on
    ///
    /// # Errors
    ///
    /// Only collaborator failures (the runner itself erroring) propagate;
    /// cycles, exhausted budgets, and cancellation are normal outcomes.
    pub async fn run_chain(
        &self,
        start: AgentRole,
        input: impl Into<String>,
        session: &mut SessionState,
    ) -> Result<ChainOutcome> {
        let mut outcome = ChainOutcome::default();
        let mut visited: HashSet<AgentRole> = HashSet::new();
        let mut current_role = start;
        let mut current_input = input.into();

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Handoff chain cancelled after {} hops", outcome.steps.len());
                outcome.halt = Some(HaltReason::Cancelled);
                break;
            }
            if outcome.steps.len() as u32 >= self.budget.max_hops {
                tracing::warn!(
                    "Handoff chain exhausted its hop budget ({})",
                    self.budget.max_hops
                );
                outcome.halt = Some(HaltReason::HopBudgetExhausted);
                break;
            }

            tracing::debug!("Invoking {} (hop {})", current_role, outcome.steps.len() + 1);
            let reply = self
                .runner
                .invoke(current_role, &current_input, session, self.budget.max_turns)
                .await?;
            visited.insert(current_role);

            let completed = reply.raw_text.contains(COMPLETION_MARKER);
            let next_agent = reply.next_agent;
            let next_input = reply
                .handoff_message
                .clone()
                .unwrap_or_else(|| reply.raw_text.clone());
            outcome.steps.push(HandoffStep {
                role: current_role,
                reply,
            });

            if completed {
                tracing::info!("Completion marker seen, marking objective complete");
                session.mark_objective_complete().await;
                outcome.completed = true;
                outcome.halt = Some(HaltReason::CompletionMarker);
                break;
            }

            match next_agent {
                None => {
                    outcome.halt = Some(HaltReason::NoNextAgent);
                    break;
                }
                Some(next) if visited.contains(&next) => {
                    tracing::warn!(
                        "Handoff chain would revisit {}, halting to avoid a loop",
                        next
                    );
                    outcome.halt = Some(HaltReason::CycleDetected);
                    break;
                }
                Some(next) => {
                    current_role = next;
                    current_input = next_input;
                }
            }
        }

        Ok(outcome)
    }
}
