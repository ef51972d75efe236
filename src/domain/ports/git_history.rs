//! Git-history retrieval provider port (spec.md §4.11).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::OrchestratorResult;

/// A recent commit touching a path, surfaced by retrieval as a synthetic
/// `type=commit` snippet.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub sha: String,
    pub summary: String,
    pub author: String,
    pub committed_at: DateTime<Utc>,
}

/// A file that tends to change alongside the queried path, surfaced as a
/// synthetic `type=co-changed` snippet.
#[derive(Debug, Clone)]
pub struct CoChangedFile {
    pub relative_path: String,
    pub co_change_count: u32,
}

/// External collaborator boundary over the repository's commit history.
#[async_trait]
pub trait GitHistoryProvider: Send + Sync {
    async fn recent_commits(&self, relative_path: &str, limit: usize) -> OrchestratorResult<Vec<CommitRecord>>;

    async fn co_changed_files(&self, relative_path: &str, limit: usize) -> OrchestratorResult<Vec<CoChangedFile>>;
}

/// Empty-history stand-in for tests and for indexing roots with no VCS.
pub struct MockGitHistoryProvider;

#[async_trait]
impl GitHistoryProvider for MockGitHistoryProvider {
    async fn recent_commits(&self, _relative_path: &str, _limit: usize) -> OrchestratorResult<Vec<CommitRecord>> {
        Ok(Vec::new())
    }

    async fn co_changed_files(&self, _relative_path: &str, _limit: usize) -> OrchestratorResult<Vec<CoChangedFile>> {
        Ok(Vec::new())
    }
}
