//! Workflow step/result/checkpoint types (spec.md §4.8, §9).
//!
//! The source's exception-driven control flow (consensus wait timeouts,
//! cancellation, rollback) is replaced here with explicit result variants,
//! per spec.md §9: `WorkflowStep` is a closed enum rather than something a
//! workflow throws its way out of.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::models::TokenUsage;
use crate::identifiers::{AgentId, TaskId};

/// The terminal value of one workflow execution attempt.
#[derive(Debug, Clone)]
pub enum WorkflowStep {
    Success { output: String, artifacts: HashMap<String, Value> },
    Failure { error: String },
    WaitingInput,
}

/// Per-agent outcome gathered by the parallel/sequential/consensus
/// executors before they fold into one [`WorkflowStep`].
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub agent_id: AgentId,
    pub output: String,
    pub confidence: f64,
    pub token_usage: TokenUsage,
    pub error: Option<String>,
}

impl AgentOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// The full result of running a task's workflow to completion, assembled
/// by [`crate::workflow::runtime::WorkflowRuntime`].
#[derive(Debug, Clone)]
pub struct WorkflowResult {
    pub task_id: TaskId,
    pub step: WorkflowStep,
    pub token_totals: TokenUsage,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl WorkflowResult {
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.ended_at - self.started_at
    }
}

/// A named point an executor can persist progress at between stages, so
/// [`crate::workflow::runtime::WorkflowRuntime::resume`] can re-enter
/// without redoing completed stages (spec.md §4.8 checkpointing).
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub checkpoint_id: String,
    pub task_id: TaskId,
    pub stage_name: String,
    pub stage_index: u32,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    #[must_use]
    pub fn new(task_id: TaskId, stage_name: impl Into<String>, stage_index: u32, payload: Value) -> Self {
        Self {
            checkpoint_id: format!("{task_id}-{stage_index}"),
            task_id,
            stage_name: stage_name.into(),
            stage_index,
            payload,
            created_at: Utc::now(),
        }
    }
}
