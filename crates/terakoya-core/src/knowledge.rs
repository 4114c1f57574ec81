//! Knowledge ingestion interface.
//!
//! Document ingestion and retrieval-index construction are external
//! collaborators. The core only holds the opaque source identifier an
//! ingestor hands back, which agents later use as a read-only capability
//! handle.

use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// An abstract ingestor that turns a set of documents into a queryable
/// knowledge source.
///
/// Ingestion failure is a hard failure: a learning session cannot proceed
/// without its reference material, so errors propagate instead of degrading.
#[async_trait]
pub trait KnowledgeIngestor: Send + Sync {
    /// Ingests the given files and returns an opaque knowledge-source id.
    ///
    /// # Arguments
    ///
    /// * `paths` - Files to ingest
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: Identifier of the constructed knowledge source
    /// - `Err(_)`: Ingestion failed
    async fn ingest(&self, paths: &[PathBuf]) -> Result<String>;
}
