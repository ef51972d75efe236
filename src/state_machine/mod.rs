//! Task lifecycle state machine: the allowed-transitions table and
//! per-task append-only history (spec.md §4.7).

use dashmap::DashMap;

use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::models::{StateTransition, TaskStatus};
use crate::identifiers::TaskId;
use std::collections::HashMap;

/// `to ∈ allowed[from]` table from spec.md §4.7. Unlisted transitions
/// (including any transition out of a terminal status) are rejected.
#[must_use]
pub fn allowed_transitions(from: TaskStatus) -> &'static [TaskStatus] {
    use TaskStatus::{Completed, Failed, InProgress, Pending, WaitingInput};
    match from {
        Pending => &[InProgress, Failed],
        InProgress => &[WaitingInput, Completed, Failed],
        WaitingInput => &[InProgress, Failed],
        Completed | Failed => &[],
    }
}

#[must_use]
pub fn is_allowed(from: TaskStatus, to: TaskStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

/// Per-task transition history, guarded by a concurrent map keyed by
/// `TaskId` (spec.md §5 shared-resource policy).
pub struct StateMachine {
    history: DashMap<TaskId, Vec<StateTransition>>,
}

impl StateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self { history: DashMap::new() }
    }

    /// Validate and record a transition. Per spec.md §9's resolution of the
    /// "after persistence" open question: this is called *after* the
    /// repository has already committed the new status, so a rejection
    /// here indicates the repository's and this table's allowed-transition
    /// sets have diverged — a programming error, not a recoverable path.
    pub fn transition(
        &self,
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
        metadata: HashMap<String, String>,
    ) -> OrchestratorResult<()> {
        if !is_allowed(from, to) {
            debug_assert!(
                false,
                "state machine rejected a transition the repository already committed: {from:?} -> {to:?}"
            );
            tracing::error!(task_id = %task_id, ?from, ?to, "rejected post-persistence transition");
            return Err(OrchestratorError::OrchestrationConflict { task_id: task_id.to_string() });
        }
        self.history.entry(task_id).or_default().push(StateTransition::new(from, to, metadata));
        Ok(())
    }

    #[must_use]
    pub fn history_for(&self, task_id: TaskId) -> Vec<StateTransition> {
        self.history.get(&task_id).map(|entry| entry.clone()).unwrap_or_default()
    }

    /// Reset all recorded history (test-reset contract, spec.md §9 — every
    /// engine-scoped service a global singleton in the source needs one).
    pub fn reset(&self) {
        self.history.clear();
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_may_move_to_in_progress_or_failed() {
        assert!(is_allowed(TaskStatus::Pending, TaskStatus::InProgress));
        assert!(is_allowed(TaskStatus::Pending, TaskStatus::Failed));
        assert!(!is_allowed(TaskStatus::Pending, TaskStatus::Completed));
    }

    #[test]
    fn terminal_statuses_allow_nothing() {
        assert!(allowed_transitions(TaskStatus::Completed).is_empty());
        assert!(allowed_transitions(TaskStatus::Failed).is_empty());
    }

    #[test]
    fn invalid_transition_is_rejected_and_not_recorded() {
        let sm = StateMachine::new();
        let task_id = TaskId::new();
        let result = sm.transition(task_id, TaskStatus::Completed, TaskStatus::InProgress, HashMap::new());
        assert!(result.is_err());
        assert!(sm.history_for(task_id).is_empty());
    }

    #[test]
    fn valid_transition_appends_history() {
        let sm = StateMachine::new();
        let task_id = TaskId::new();
        sm.transition(task_id, TaskStatus::Pending, TaskStatus::InProgress, HashMap::new()).unwrap();
        let history = sm.history_for(task_id);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from, TaskStatus::Pending);
        assert_eq!(history[0].to, TaskStatus::InProgress);
    }
}
