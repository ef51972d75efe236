//! Agent invocation port — the contract external agent collaborators
//! implement (spec.md §6).

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::OrchestratorResult;
use crate::domain::models::{Task, TokenUsage};
use crate::identifiers::AgentId;

/// The result of invoking one agent on one task.
#[derive(Debug, Clone)]
pub struct AgentInvocationOutcome {
    pub output: String,
    pub confidence: f64,
    pub token_usage: TokenUsage,
    pub error: Option<String>,
}

impl AgentInvocationOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// External collaborator boundary for invoking an agent. Implementations
/// must be idempotent for a given `(task_id, agent_id, input_seed)`
/// (spec.md §6) so that retried invocations — e.g. after a workflow resume
/// — do not double-bill or double-act.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(
        &self,
        agent_id: AgentId,
        task: &Task,
        inputs: &Value,
    ) -> OrchestratorResult<AgentInvocationOutcome>;
}

/// Deterministic stand-in used by tests and by the workflow runtime's own
/// unit tests; never wired in production (the real agent is an external
/// collaborator, spec.md §1).
pub struct MockAgentInvoker {
    pub fixed_output: String,
    pub fixed_confidence: f64,
}

impl MockAgentInvoker {
    #[must_use]
    pub fn new(fixed_output: impl Into<String>, fixed_confidence: f64) -> Self {
        Self {
            fixed_output: fixed_output.into(),
            fixed_confidence,
        }
    }
}

#[async_trait]
impl AgentInvoker for MockAgentInvoker {
    async fn invoke(
        &self,
        _agent_id: AgentId,
        _task: &Task,
        _inputs: &Value,
    ) -> OrchestratorResult<AgentInvocationOutcome> {
        Ok(AgentInvocationOutcome {
            output: self.fixed_output.clone(),
            confidence: self.fixed_confidence,
            token_usage: TokenUsage { input: 0, output: 0 },
            error: None,
        })
    }
}
