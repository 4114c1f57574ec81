//! Terakoya infrastructure.
//!
//! Storage backends for user progress and the configuration plumbing that
//! selects between them. Both backends implement the same
//! [`ProgressRepository`] contract and produce observably equivalent
//! round-trips for the same logical writes.

pub mod config_service;
pub mod json_progress_repository;
pub mod paths;
pub mod sqlite_progress_repository;

pub use crate::config_service::ConfigService;
pub use crate::json_progress_repository::JsonProgressRepository;
pub use crate::paths::TerakoyaPaths;
pub use crate::sqlite_progress_repository::SqliteProgressRepository;

use std::sync::Arc;
use terakoya_core::config::{StorageBackend, StorageConfig};
use terakoya_core::error::Result;
use terakoya_core::progress::ProgressRepository;

/// Opens the progress repository the configuration selects.
///
/// This is the single place where the backend choice is examined.
///
/// # Errors
///
/// Returns an error if the storage location cannot be resolved or the backend
/// cannot be initialized.
pub fn open_progress_repository(config: &StorageConfig) -> Result<Arc<dyn ProgressRepository>> {
    let storage_dir = match &config.storage_dir {
        Some(dir) => dir.clone(),
        None => TerakoyaPaths::progress_dir()?,
    };

    match config.backend {
        StorageBackend::Json => Ok(Arc::new(JsonProgressRepository::new(storage_dir)?)),
        StorageBackend::Sqlite => Ok(Arc::new(SqliteProgressRepository::new(
            storage_dir.join("progress.db"),
        )?)),
    }
}
