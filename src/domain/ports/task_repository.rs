//! Task repository port — the storage surface of spec.md §6.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::OrchestratorResult;
use crate::domain::models::{Task, TaskStatus};
use crate::identifiers::{AgentId, TaskId};

/// Filter criteria for the task query surface consumed by the (excluded)
/// HTTP layer (spec.md §6).
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub agent_id: Option<AgentId>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

/// A 1-indexed page request; `offset` is computed in 64-bit arithmetic as
/// `(page - 1) * page_size` (spec.md §6).
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: u64,
    pub page_size: u64,
}

impl Page {
    pub const MAX_PAGE_SIZE: u64 = 200;

    pub fn new(page: u64, page_size: u64) -> OrchestratorResult<Self> {
        if page < 1 {
            return Err(crate::domain::errors::OrchestratorError::InvalidInput(
                "page must be >= 1".to_string(),
            ));
        }
        if page_size < 1 || page_size > Self::MAX_PAGE_SIZE {
            return Err(crate::domain::errors::OrchestratorError::InvalidInput(format!(
                "page_size must be in [1,{}]",
                Self::MAX_PAGE_SIZE
            )));
        }
        Ok(Self { page, page_size })
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.page_size
    }
}

/// Repository interface for `Task` persistence.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert(&self, task: &Task) -> OrchestratorResult<()>;

    async fn update(&self, task: &Task) -> OrchestratorResult<()>;

    /// Optimistic-concurrency status transition: succeeds and returns
    /// `true` iff the task's current status is in `expected_from`, moving
    /// it to `to`; returns `false` (not an error) on mismatch, per spec.md
    /// §4.8 step 5 and §7 (`OrchestrationConflict`).
    async fn update_status(
        &self,
        id: TaskId,
        to: TaskStatus,
        expected_from: &[TaskStatus],
    ) -> OrchestratorResult<bool>;

    async fn find_by_id(&self, id: TaskId) -> OrchestratorResult<Option<Task>>;

    async fn find_by_status(&self, status: TaskStatus) -> OrchestratorResult<Vec<Task>>;

    async fn find_by_agent(&self, agent_id: AgentId) -> OrchestratorResult<Vec<Task>>;

    async fn query_filtered(&self, filter: TaskFilter, page: Page) -> OrchestratorResult<Vec<Task>>;

    /// Merge additional metadata entries into a task's metadata map and
    /// persist, without requiring the caller to round-trip the whole
    /// record (used by the strategy picker to attach routing metadata).
    async fn merge_metadata(&self, id: TaskId, metadata: HashMap<String, String>) -> OrchestratorResult<()>;
}
