//! Crate-wide error taxonomy.
//!
//! Variants map 1:1 onto the error kinds of spec.md §7. Every propagated
//! error carries the relevant identifier/path and a short rationale; no
//! variant is a bare passthrough.

use thiserror::Error;

/// Errors surfaced by the orchestration kernel.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Malformed directive, out-of-range pagination, or a bad identifier.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An identifier failed validation (wrong length, alphabet, or
    /// out-of-window timestamp).
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The agent selector found no eligible agent for a task.
    #[error("no eligible agent for task {task_id}: {reason}")]
    NoEligibleAgent { task_id: String, reason: String },

    /// An optimistic `updateStatus` call observed a concurrent modification.
    #[error("orchestration conflict on task {task_id}: concurrent modification")]
    OrchestrationConflict { task_id: String },

    /// The underlying store rejected an operation.
    #[error("persistence failure for task {task_id}: {source}")]
    PersistenceFailure {
        task_id: String,
        #[source]
        source: anyhow::Error,
    },

    /// A workflow executor returned a terminal failure.
    #[error("workflow failure for task {task_id}: {reason}")]
    WorkflowFailure { task_id: String, reason: String },

    /// Cooperative cancellation; must propagate without state mutation.
    #[error("cancelled")]
    Cancelled,

    /// Per-file indexing failure, collected into a batch result rather than
    /// aborting the batch.
    #[error("indexing failure for {path}: {reason}")]
    IndexingFailure { path: String, reason: String },

    /// Restoration after a failed artifact replace itself failed. The
    /// original exception that triggered the rollback still surfaces
    /// alongside this one.
    #[error("rollback failure for {path}: {reason}")]
    RollbackFailure { path: String, reason: String },

    /// A referenced file was not found when hashing or reading it.
    #[error("file not found: {0}")]
    FileNotFound(String),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

impl From<sqlx::Error> for OrchestratorError {
    fn from(err: sqlx::Error) -> Self {
        OrchestratorError::PersistenceFailure {
            task_id: "unknown".to_string(),
            source: anyhow::Error::new(err),
        }
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(err: serde_json::Error) -> Self {
        OrchestratorError::InvalidInput(err.to_string())
    }
}
