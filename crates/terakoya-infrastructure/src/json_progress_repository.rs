//! JSON file-based ProgressRepository implementation.
//!
//! One human-inspectable document per user, overwritten wholesale on every
//! save (last writer wins). Writes go through a tmp file plus atomic rename,
//! under a per-user advisory lock so concurrent saves for the same user
//! serialize.

use crate::paths::TerakoyaPaths;
use async_trait::async_trait;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use terakoya_core::error::{Result, TerakoyaError};
use terakoya_core::progress::{ProgressRepository, UserRecord};

/// Flat-file progress repository.
///
/// Directory structure:
/// ```text
/// storage_dir/
/// ├── user_alice.json
/// ├── user_alice.json.lock
/// └── user_bob.json
/// ```
pub struct JsonProgressRepository {
    storage_dir: PathBuf,
}

impl JsonProgressRepository {
    /// Creates a repository rooted at the given directory.
    ///
    /// The directory is created if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(storage_dir: impl AsRef<Path>) -> Result<Self> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        fs::create_dir_all(&storage_dir)?;
        Ok(Self { storage_dir })
    }

    /// Creates a repository at the default platform location.
    pub fn default_location() -> Result<Self> {
        Self::new(TerakoyaPaths::progress_dir()?)
    }

    fn user_path(&self, user_id: &str) -> PathBuf {
        self.storage_dir.join(format!("user_{}.json", user_id))
    }

    fn write_document(path: &Path, record: &UserRecord) -> Result<()> {
        // Per-user advisory lock; concurrent saves for the same user serialize
        let lock_path = path.with_extension("json.lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        lock_file.lock_exclusive()?;

        let json = serde_json::to_string_pretty(record)?;

        // tmp file + atomic rename, so readers never observe a partial write
        let file_name = path
            .file_name()
            .ok_or_else(|| TerakoyaError::io("path has no file name"))?;
        let tmp_path = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(json.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);
        fs::rename(&tmp_path, path)?;

        let _ = FileExt::unlock(&lock_file);
        Ok(())
    }

    fn read_document(path: &Path) -> Result<UserRecord> {
        if !path.exists() {
            return Ok(UserRecord::default());
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(UserRecord::default());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl ProgressRepository for JsonProgressRepository {
    async fn save(&self, user_id: &str, record: &UserRecord) -> Result<()> {
        let path = self.user_path(user_id);
        let mut record = record.clone();
        record.last_updated = Some(chrono::Utc::now().to_rfc3339());

        tokio::task::spawn_blocking(move || Self::write_document(&path, &record))
            .await
            .map_err(|e| TerakoyaError::internal(format!("save task panicked: {}", e)))??;

        tracing::debug!("Saved progress document for user {}", user_id);
        Ok(())
    }

    async fn load(&self, user_id: &str) -> Result<UserRecord> {
        let path = self.user_path(user_id);
        tokio::task::spawn_blocking(move || Self::read_document(&path))
            .await
            .map_err(|e| TerakoyaError::internal(format!("load task panicked: {}", e)))?
    }
}
