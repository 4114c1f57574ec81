//! Handoff orchestration module.
//!
//! This module drives a chain of specialized agent invocations, each of which
//! may name the next agent to hand control to. The engine enforces the two
//! safety properties agents cannot be trusted with: a cycle guard over agent
//! identities and a hop budget for the chain as a whole.
//!
//! # Module Structure
//!
//! - `agent`: Agent identities and the injected invocation capability
//!   (`AgentRole`, `AgentReply`, `AgentRunner`)
//! - `engine`: The chain executor (`HandoffEngine`, `ChainOutcome`,
//!   `HandoffBudget`, `HaltReason`)
//!
//! # Usage
//!
//! ```ignore
//! use terakoya_core::handoff::{AgentRole, HandoffEngine};
//! ```

mod agent;
mod engine;

pub use agent::{AgentReply, AgentRole, AgentRunner};
pub use engine::{
    COMPLETION_MARKER, ChainOutcome, HaltReason, HandoffBudget, HandoffEngine, HandoffStep,
};
