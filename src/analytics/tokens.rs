//! Token analytics: running per-task and per-agent token accumulators.
//!
//! Grounded on the teacher's `services/cost_tracker.rs` `CostSummary`
//! accumulate-and-query shape, narrowed to spec.md §2's "token ...
//! analytics" line — this crate treats pricing as a collaborator's concern
//! and only accumulates the `{input, output}` counts the core already
//! carries on `TokenUsage`.

use dashmap::DashMap;

use crate::domain::models::TokenUsage;
use crate::identifiers::{AgentId, TaskId};

/// Running token totals keyed by task and by agent, plus a grand total.
/// Engine-scoped: construct one per orchestrator instance (spec.md §9).
#[derive(Default)]
pub struct TokenAnalytics {
    by_task: DashMap<TaskId, TokenUsage>,
    by_agent: DashMap<AgentId, TokenUsage>,
}

impl TokenAnalytics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `usage` into the running totals for `task_id` and `agent_id`.
    pub fn record(&self, task_id: TaskId, agent_id: AgentId, usage: TokenUsage) {
        *self.by_task.entry(task_id).or_default() = *self.by_task.entry(task_id).or_default() + usage;
        *self.by_agent.entry(agent_id).or_default() = *self.by_agent.entry(agent_id).or_default() + usage;
    }

    #[must_use]
    pub fn for_task(&self, task_id: TaskId) -> TokenUsage {
        self.by_task.get(&task_id).map(|v| *v).unwrap_or_default()
    }

    #[must_use]
    pub fn for_agent(&self, agent_id: AgentId) -> TokenUsage {
        self.by_agent.get(&agent_id).map(|v| *v).unwrap_or_default()
    }

    #[must_use]
    pub fn grand_total(&self) -> TokenUsage {
        self.by_task.iter().fold(TokenUsage::default(), |acc, entry| acc + *entry.value())
    }

    /// Test/diagnostic reset contract (spec.md §9).
    pub fn reset(&self) {
        self.by_task.clear();
        self.by_agent.clear();
    }
}
