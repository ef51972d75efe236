//! Decision repository port.

use async_trait::async_trait;

use crate::domain::errors::OrchestratorResult;
use crate::domain::models::Decision;
use crate::identifiers::TaskId;

/// Repository interface for `Decision` persistence. A decision is persisted
/// atomically with its considered-proposal list (spec.md §4.9) — the
/// repository stores the list inline rather than as a separate join write.
#[async_trait]
pub trait DecisionRepository: Send + Sync {
    async fn insert(&self, decision: &Decision) -> OrchestratorResult<()>;

    async fn find_by_task(&self, task_id: TaskId) -> OrchestratorResult<Option<Decision>>;
}
