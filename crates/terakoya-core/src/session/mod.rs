//! Learning session module.
//!
//! This module contains the in-memory state of one user's active learning
//! session. The session state is the aggregate root for objectives, plans,
//! progress, and assessments, and is the only component that writes to the
//! progress store.
//!
//! # Module Structure
//!
//! - `state`: The session aggregate (`SessionState`, `TopicAttempt`,
//!   `ProgressReport`)
//!
//! # Usage
//!
//! ```ignore
//! use terakoya_core::session::SessionState;
//! ```

mod state;

pub use state::{ProgressReport, SessionState, TopicAttempt};
