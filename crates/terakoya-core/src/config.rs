use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which persistent-store backend to use for user progress.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// One human-readable JSON document per user.
    Json,
    /// Normalized SQLite database shared by all users.
    Sqlite,
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::Json
    }
}

/// Storage configuration, loaded from `config.toml` in the config directory.
///
/// The backend is selected here once at construction time; nothing outside
/// the store layer branches on it.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Overrides the platform storage directory when set.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
}
