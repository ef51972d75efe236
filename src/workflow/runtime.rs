//! Workflow runtime: owns task execution end to end (spec.md §4.8).
//!
//! Generic over the three repositories it needs, the way the teacher's
//! `SwarmOrchestrator<G, T, W, A, M>` is generic over its storage
//! dependencies rather than hand-wiring concrete types.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;

use crate::classification::{self, strategy_picker::StrategyThresholds};
use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::models::{RoutingStrategy, Task, TaskStatus, TokenUsage};
use crate::domain::ports::{AgentInvoker, TaskRepository};
use crate::events::{EventBus, EventKind};
use crate::identifiers::TaskId;
use crate::registry::AgentRegistry;
use crate::state_machine::StateMachine;

use super::checkpoint::CheckpointStore;
use super::executors::{ExecutionContext, WorkflowExecutor};
use super::types::{Checkpoint, WorkflowResult, WorkflowStep};

/// Default upper bound the consensus executor waits for stragglers before
/// deciding with whatever proposals have arrived (spec.md §4.8/§4.9).
pub const DEFAULT_CONSENSUS_WAIT: Duration = Duration::from_secs(30);

/// Per-task mutual exclusion table. A `tokio::sync::Mutex` rather than a
/// `std::sync::Mutex` because the guard is held across `.await` points
/// (spec.md §5 "mutex survives suspension").
struct LockTable {
    locks: DashMap<TaskId, Arc<AsyncMutex<()>>>,
}

impl LockTable {
    fn new() -> Self {
        Self { locks: DashMap::new() }
    }

    fn lock_for(&self, task_id: TaskId) -> Arc<AsyncMutex<()>> {
        self.locks.entry(task_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }
}

/// Owns task execution: persistence, routing, status transitions, executor
/// dispatch, checkpointing, and event publication, all under per-task
/// serialization.
pub struct WorkflowRuntime<T> {
    tasks: T,
    registry: AgentRegistry,
    state_machine: StateMachine,
    events: Arc<EventBus>,
    locks: LockTable,
    checkpoints: CheckpointStore,
    thresholds: StrategyThresholds,
    consensus_wait: Duration,
}

impl<T> WorkflowRuntime<T>
where
    T: TaskRepository,
{
    pub fn new(tasks: T, registry: AgentRegistry, events: Arc<EventBus>) -> Self {
        Self {
            tasks,
            registry,
            state_machine: StateMachine::new(),
            events,
            locks: LockTable::new(),
            checkpoints: CheckpointStore::new(),
            thresholds: StrategyThresholds::default(),
            consensus_wait: DEFAULT_CONSENSUS_WAIT,
        }
    }

    #[must_use]
    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    #[must_use]
    pub fn history_for(&self, task_id: TaskId) -> Vec<crate::domain::models::StateTransition> {
        self.state_machine.history_for(task_id)
    }

    async fn transition(&self, task_id: TaskId, from: TaskStatus, to: TaskStatus) -> OrchestratorResult<()> {
        let moved = self.tasks.update_status(task_id, to, &[from]).await?;
        if !moved {
            return Err(OrchestratorError::OrchestrationConflict { task_id: task_id.to_string() });
        }
        self.state_machine.transition(task_id, from, to, HashMap::new())?;
        self.events.publish(EventKind::StateTransition { task_id, from, to });
        Ok(())
    }

    /// Run steps 1–7 of spec.md §4.8 for a freshly drafted task: persist,
    /// route, execute, and assemble a [`WorkflowResult`].
    pub async fn submit(
        &self,
        mut task: Task,
        directive_text: &str,
        invoker: &dyn AgentInvoker,
        inputs: Value,
        executor_for: impl Fn(RoutingStrategy) -> Option<Box<dyn WorkflowExecutor>>,
    ) -> OrchestratorResult<WorkflowResult> {
        let task_id = task.id;
        let lock = self.locks.lock_for(task_id);
        let _guard = lock.lock().await;

        let started_at = chrono::Utc::now();

        self.tasks.insert(&task).await?;
        self.events.publish(EventKind::TaskCreated { task_id });

        let routing = match classification::route(&task, directive_text, &self.registry, &self.thresholds) {
            Ok(routing) => routing,
            Err(err @ OrchestratorError::NoEligibleAgent { .. }) => {
                self.transition(task_id, TaskStatus::Pending, TaskStatus::Failed).await.ok();
                let ended_at = chrono::Utc::now();
                self.events.publish(EventKind::WorkflowFailed { task_id, reason: err.to_string() });
                return Ok(WorkflowResult {
                    task_id,
                    step: WorkflowStep::Failure { error: err.to_string() },
                    token_totals: TokenUsage::default(),
                    started_at,
                    ended_at,
                });
            }
            Err(err) => return Err(err),
        };
        task.strategy = Some(routing.strategy);
        task.assignees = routing.participant_agent_ids.clone();
        task.touch();
        self.tasks.update(&task).await?;
        self.tasks.merge_metadata(task_id, routing.metadata).await?;
        self.events.publish(EventKind::TaskRouted { task_id, strategy: routing.strategy });

        let Some(executor) = executor_for(routing.strategy) else {
            self.transition(task_id, TaskStatus::Pending, TaskStatus::Failed).await.ok();
            let ended_at = chrono::Utc::now();
            self.events.publish(EventKind::WorkflowFailed {
                task_id,
                reason: format!("no executor registered for strategy {}", routing.strategy.as_str()),
            });
            return Ok(WorkflowResult {
                task_id,
                step: WorkflowStep::Failure {
                    error: format!("no executor registered for strategy {}", routing.strategy.as_str()),
                },
                token_totals: TokenUsage::default(),
                started_at,
                ended_at,
            });
        };

        self.transition(task_id, TaskStatus::Pending, TaskStatus::InProgress).await?;
        self.events.publish(EventKind::WorkflowStarted { task_id });

        let ctx = ExecutionContext {
            invoker,
            assignees: &routing.participant_agent_ids,
            inputs,
            consensus_wait: self.consensus_wait,
        };
        let (step, token_totals) = executor.execute(&task, &ctx).await;

        let to = match &step {
            WorkflowStep::Success { .. } => TaskStatus::Completed,
            WorkflowStep::Failure { .. } => TaskStatus::Failed,
            WorkflowStep::WaitingInput => TaskStatus::WaitingInput,
        };
        self.transition(task_id, TaskStatus::InProgress, to).await?;

        match &step {
            WorkflowStep::Success { .. } => self.events.publish(EventKind::WorkflowCompleted { task_id }),
            WorkflowStep::Failure { error } => {
                self.events.publish(EventKind::WorkflowFailed { task_id, reason: error.clone() })
            }
            WorkflowStep::WaitingInput => {}
        }

        let ended_at = chrono::Utc::now();
        Ok(WorkflowResult { task_id, step, token_totals, started_at, ended_at })
    }

    /// Persist a named checkpoint for `task_id` at `stage_index`, under the
    /// same per-task mutex an executor already holds while running.
    pub fn checkpoint(&self, task_id: TaskId, stage_name: impl Into<String>, stage_index: u32, payload: Value) {
        self.checkpoints.record(Checkpoint::new(task_id, stage_name, stage_index, payload));
    }

    /// Re-enter a task's workflow at the latest checkpoint at or before
    /// `checkpoint_id`, reusing the same mutex and state-machine path
    /// (spec.md §4.8 resume semantics). Returns `None` if no checkpoint
    /// qualifies.
    pub async fn resume(&self, task_id: TaskId, checkpoint_id: Option<&str>) -> OrchestratorResult<Option<Checkpoint>> {
        let lock = self.locks.lock_for(task_id);
        let _guard = lock.lock().await;

        let Some(task) = self.tasks.find_by_id(task_id).await? else {
            return Err(OrchestratorError::InvalidInput(format!("unknown task {task_id}")));
        };
        if task.status.is_terminal() {
            return Ok(None);
        }

        let checkpoint = match checkpoint_id {
            Some(id) => self.checkpoints.latest_at_or_before(task_id, id),
            None => self.checkpoints.latest(task_id),
        };
        Ok(checkpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Agent, Capability, TaskType};
    use crate::domain::ports::MockAgentInvoker;
    use crate::storage::sqlite::{create_test_pool, run_migrations, SqliteTaskRepository};

    async fn in_memory_runtime() -> WorkflowRuntime<SqliteTaskRepository> {
        let pool = create_test_pool().await.expect("in-memory pool");
        run_migrations(&pool).await.expect("migrations");
        let repo = SqliteTaskRepository::new(pool);
        let agents = vec![Agent::new("solo-agent", "test").with_capabilities([Capability::CodeGeneration])];
        WorkflowRuntime::new(repo, AgentRegistry::new(agents), Arc::new(EventBus::new()))
    }

    #[tokio::test]
    async fn submit_runs_solo_strategy_to_completion() {
        let runtime = in_memory_runtime().await;
        let task = Task::new("implement the thing", TaskType::Implementation, 3, 2);
        let invoker = MockAgentInvoker::new("done", 0.9);

        let result = runtime
            .submit(task, "just implement it solo", &invoker, Value::Null, |strategy| {
                if strategy == RoutingStrategy::Solo {
                    Some(Box::new(super::super::executors::SoloExecutor))
                } else {
                    None
                }
            })
            .await
            .unwrap();

        assert!(matches!(result.step, WorkflowStep::Success { .. }));
    }

    #[tokio::test]
    async fn submit_marks_task_failed_when_no_eligible_agent() {
        let runtime = in_memory_runtime().await;
        let task = Task::new("write tests for the thing", TaskType::Testing, 3, 2);
        let invoker = MockAgentInvoker::new("done", 0.9);

        let result = runtime
            .submit(task, "just implement it solo", &invoker, Value::Null, |strategy| {
                if strategy == RoutingStrategy::Solo {
                    Some(Box::new(super::super::executors::SoloExecutor))
                } else {
                    None
                }
            })
            .await
            .unwrap();

        assert!(matches!(result.step, WorkflowStep::Failure { .. }));
        let stored = runtime.tasks.find_by_id(result.task_id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn checkpoint_then_resume_returns_the_recorded_checkpoint() {
        let runtime = in_memory_runtime().await;
        let task = Task::new("implement the thing", TaskType::Implementation, 3, 2);
        let task_id = task.id;
        runtime.tasks.insert(&task).await.unwrap();

        runtime.checkpoint(task_id, "gathered-inputs", 0, Value::Null);
        runtime.checkpoint(task_id, "drafted-patch", 1, serde_json::json!({"draft": "v1"}));

        let resumed = runtime.resume(task_id, None).await.unwrap();
        let checkpoint = resumed.expect("in-progress task must have a resumable checkpoint");
        assert_eq!(checkpoint.stage_index, 1);
        assert_eq!(checkpoint.stage_name, "drafted-patch");
    }

    #[tokio::test]
    async fn resume_returns_none_for_a_terminal_task() {
        let runtime = in_memory_runtime().await;
        let task = Task::new("implement the thing", TaskType::Implementation, 3, 2);
        let invoker = MockAgentInvoker::new("done", 0.9);

        let result = runtime
            .submit(task, "just implement it solo", &invoker, Value::Null, |strategy| {
                if strategy == RoutingStrategy::Solo {
                    Some(Box::new(super::super::executors::SoloExecutor))
                } else {
                    None
                }
            })
            .await
            .unwrap();
        assert!(matches!(result.step, WorkflowStep::Success { .. }));

        let resumed = runtime.resume(result.task_id, None).await.unwrap();
        assert!(resumed.is_none(), "a completed task has nothing to resume");
    }

    #[tokio::test]
    async fn submit_fails_when_no_executor_registered_for_strategy() {
        let runtime = in_memory_runtime().await;
        let task = Task::new("implement the thing", TaskType::Implementation, 3, 2);
        let invoker = MockAgentInvoker::new("done", 0.9);

        let result = runtime
            .submit(task, "just implement it solo", &invoker, Value::Null, |_| None)
            .await
            .unwrap();

        assert!(matches!(result.step, WorkflowStep::Failure { .. }));
    }
}
