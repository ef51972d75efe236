//! Crate-level end-to-end scenarios from spec.md §8, exercised through the
//! public API rather than a single module's internals.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orchestrator_kernel::classification::{pick_strategy, strategy_picker::StrategyThresholds};
use orchestrator_kernel::domain::models::{Agent, Capability, RoutingStrategy, Task, TaskStatus, TaskType};
use orchestrator_kernel::domain::ports::{AgentInvocationOutcome, AgentInvoker, MockAgentInvoker};
use orchestrator_kernel::events::EventBus;
use orchestrator_kernel::identifiers::AgentId;
use orchestrator_kernel::registry::AgentRegistry;
use orchestrator_kernel::storage::sqlite::{create_test_pool, run_migrations, SqliteTaskRepository};
use orchestrator_kernel::workflow::executors::SoloExecutor;
use orchestrator_kernel::workflow::WorkflowRuntime;
use serde_json::Value;

async fn runtime_with(agents: Vec<Agent>) -> WorkflowRuntime<SqliteTaskRepository> {
    let pool = create_test_pool().await.expect("in-memory pool");
    run_migrations(&pool).await.expect("migrations");
    let repo = SqliteTaskRepository::new(pool);
    WorkflowRuntime::new(repo, AgentRegistry::new(agents), Arc::new(EventBus::new()))
}

/// Scenario 2: emergency bypass. A bugfix with complexity 8 / risk 10, but
/// an emergency directive with no forcing cue, routes solo and the task's
/// initial workflow transitions straight to `in-progress` (and on to
/// `completed` once the solo agent responds), never touching `consensus`.
#[tokio::test]
async fn emergency_bypass_routes_solo_and_runs_to_completion() {
    let agent = Agent::new("oncall-fixer", "test").with_capabilities([Capability::Debugging, Capability::CodeGeneration]);
    let runtime = runtime_with(vec![agent]).await;

    let task = Task::new("fix the outage", TaskType::Bugfix, 8, 10);
    let invoker = MockAgentInvoker::new("rolled back the bad deploy", 0.95);

    let result = runtime
        .submit(
            task,
            "Emergency: production down. Skip review and ship",
            &invoker,
            Value::Null,
            |strategy| if strategy == RoutingStrategy::Solo { Some(Box::new(SoloExecutor)) } else { None },
        )
        .await
        .unwrap();

    assert!(matches!(result.step, orchestrator_kernel::workflow::types::WorkflowStep::Success { .. }));

    let history = runtime.history_for(result.task_id);
    assert_eq!(history[0].from, TaskStatus::Pending);
    assert_eq!(history[0].to, TaskStatus::InProgress);
}

/// Scenario 6 at the strategy-picker level, paired with the repository:
/// an `OrchestrationConflict` surfaces and the persisted row is untouched
/// when a caller tries to move a task out of a terminal status.
#[tokio::test]
async fn invalid_transition_leaves_persisted_status_untouched() {
    let pool = create_test_pool().await.unwrap();
    run_migrations(&pool).await.unwrap();
    let repo = SqliteTaskRepository::new(pool);

    let mut task = Task::new("ship the feature", TaskType::Implementation, 3, 2);
    task.status = TaskStatus::Completed;
    orchestrator_kernel::domain::ports::TaskRepository::insert(&repo, &task).await.unwrap();

    let moved = orchestrator_kernel::domain::ports::TaskRepository::update_status(
        &repo,
        task.id,
        TaskStatus::InProgress,
        &[TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::WaitingInput],
    )
    .await
    .unwrap();
    assert!(!moved, "completed is terminal; update_status must refuse to move off of it");

    let stored = orchestrator_kernel::domain::ports::TaskRepository::find_by_id(&repo, task.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, TaskStatus::Completed);
}

/// T2: at most one workflow execution runs at a time for a given task id,
/// even when the agent invocation suspends. We simulate two concurrent
/// submissions that collide on the same task id (second constructed with
/// an identical id to the first) and assert the second only reaches the
/// repository after the first's slow invocation has fully finished —
/// i.e. the per-task mutex, not raw concurrency, governs ordering.
struct SlowInvoker {
    delay: Duration,
}

#[async_trait]
impl AgentInvoker for SlowInvoker {
    async fn invoke(
        &self,
        _agent_id: AgentId,
        _task: &Task,
        _inputs: &Value,
    ) -> orchestrator_kernel::domain::errors::OrchestratorResult<AgentInvocationOutcome> {
        tokio::time::sleep(self.delay).await;
        Ok(AgentInvocationOutcome {
            output: "done".to_string(),
            confidence: 0.9,
            token_usage: Default::default(),
            error: None,
        })
    }
}

#[tokio::test]
async fn per_task_mutex_serializes_concurrent_submissions_of_the_same_id() {
    let agent = Agent::new("solo-agent", "test").with_capabilities([Capability::CodeGeneration]);
    let runtime = Arc::new(runtime_with(vec![agent]).await);

    let first_task = Task::new("build the thing", TaskType::Implementation, 3, 2);
    let shared_id = first_task.id;
    let mut second_task = Task::new("build the thing again", TaskType::Implementation, 3, 2);
    second_task.id = shared_id;

    let slow_invoker = Arc::new(SlowInvoker { delay: Duration::from_millis(150) });

    let runtime_a = Arc::clone(&runtime);
    let invoker_a = Arc::clone(&slow_invoker);
    let first = tokio::spawn(async move {
        runtime_a
            .submit(first_task, "just implement it solo", invoker_a.as_ref(), Value::Null, |strategy| {
                if strategy == RoutingStrategy::Solo { Some(Box::new(SoloExecutor)) } else { None }
            })
            .await
    });

    // Give the first submission time to acquire the lock before the second
    // is dispatched, so we're testing queued-behind-the-holder ordering
    // rather than a race for who gets there first.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let runtime_b = Arc::clone(&runtime);
    let invoker_b = Arc::clone(&slow_invoker);
    let second = tokio::spawn(async move {
        runtime_b
            .submit(second_task, "just implement it solo", invoker_b.as_ref(), Value::Null, |strategy| {
                if strategy == RoutingStrategy::Solo { Some(Box::new(SoloExecutor)) } else { None }
            })
            .await
    });

    let start = tokio::time::Instant::now();
    let first_result = first.await.unwrap().unwrap();
    let second_result = second.await.unwrap();
    let elapsed = start.elapsed();

    assert!(matches!(first_result.step, orchestrator_kernel::workflow::types::WorkflowStep::Success { .. }));
    // The second submission can only attempt its insert after the first
    // has released the per-task mutex (end of `submit`), so it fails on
    // the duplicate primary key rather than interleaving with the first.
    assert!(second_result.is_err(), "second submission for the same task id must not succeed concurrently");
    // Total elapsed time must cover both delays serialized, not run in
    // parallel (which would finish in ~150ms instead of ~300ms+).
    assert!(elapsed >= Duration::from_millis(280), "executions for the same task id ran concurrently: {elapsed:?}");
}

/// Documents the strategy picker's precedence for the emergency scenario
/// directly, independent of the workflow runtime plumbing above.
#[test]
fn strategy_picker_prefers_solo_on_emergency_without_forcing_cue() {
    let task = Task::new("fix the outage", TaskType::Bugfix, 8, 10);
    let directive = orchestrator_kernel::classification::parse_directive(
        "Emergency: production down. Skip review and ship",
        &AgentRegistry::new(Vec::new()),
    );
    let choice = pick_strategy(&task, &directive, None, &StrategyThresholds::default());
    assert_eq!(choice.strategy, RoutingStrategy::Solo);
}
