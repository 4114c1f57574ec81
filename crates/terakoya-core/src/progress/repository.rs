//! Progress repository trait.
//!
//! Defines the interface for user-progress persistence operations.

use super::model::UserRecord;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for persisting user learning progress.
///
/// This trait defines the contract both store backends implement (one JSON
/// document per user, or a normalized SQLite database), decoupling the
/// session layer from the specific storage mechanism.
///
/// # Implementation Notes
///
/// Implementations must:
/// - Return an empty [`UserRecord`] for an unknown user, not an error
/// - Create the storage directory or database transparently on first save
/// - Serialize concurrent saves for the same user (last completed write wins)
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Saves the full record for a user, replacing whatever was stored.
    ///
    /// # Arguments
    ///
    /// * `user_id` - Unique identifier for the user
    /// * `record` - The complete record to persist
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Record saved successfully
    /// - `Err(_)`: Error occurred during save
    async fn save(&self, user_id: &str, record: &UserRecord) -> Result<()>;

    /// Loads the full record for a user.
    ///
    /// # Arguments
    ///
    /// * `user_id` - Unique identifier for the user
    ///
    /// # Returns
    ///
    /// - `Ok(UserRecord)`: The stored record, or an empty record for an
    ///   unknown user
    /// - `Err(_)`: Error occurred during retrieval
    async fn load(&self, user_id: &str) -> Result<UserRecord>;
}
