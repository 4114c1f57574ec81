//! Unified path management for Terakoya files.
//!
//! All configuration and progress data live under the platform config
//! directory so every storage backend resolves locations the same way.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/terakoya/          # Config directory
//! ├── config.toml              # Storage configuration
//! └── progress/                # User progress data
//!     ├── user_<id>.json       # JSON backend, one document per user
//!     └── progress.db          # SQLite backend, shared database
//! ```

use std::path::PathBuf;
use terakoya_core::error::{Result, TerakoyaError};

/// Unified path management for Terakoya.
pub struct TerakoyaPaths;

impl TerakoyaPaths {
    /// Returns the Terakoya configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to the config directory (e.g., `~/.config/terakoya/`)
    /// - `Err(_)`: The platform config directory could not be determined
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("terakoya"))
            .ok_or_else(|| TerakoyaError::config("cannot determine config directory"))
    }

    /// Returns the directory where user progress is stored.
    pub fn progress_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("progress"))
    }

    /// Returns the path to the storage configuration file.
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }
}
