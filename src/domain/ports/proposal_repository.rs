//! Proposal repository port.

use async_trait::async_trait;

use crate::domain::errors::OrchestratorResult;
use crate::domain::models::Proposal;
use crate::identifiers::{AgentId, TaskId};

/// Repository interface for `Proposal` persistence. Intake is idempotent on
/// `(task_id, agent_id)` — `insert` is a no-op success if a proposal for
/// that pair already exists (spec.md §4.9).
#[async_trait]
pub trait ProposalRepository: Send + Sync {
    async fn insert(&self, proposal: &Proposal) -> OrchestratorResult<()>;

    async fn find_by_task(&self, task_id: TaskId) -> OrchestratorResult<Vec<Proposal>>;

    async fn find_one(&self, task_id: TaskId, agent_id: AgentId) -> OrchestratorResult<Option<Proposal>>;
}
