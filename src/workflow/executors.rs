//! Strategy executors: the four ways a task's assignees can be invoked
//! (spec.md §4.8).
//!
//! Grounded on the teacher's `services/swarm_orchestrator/dag_execution.rs`
//! fan-out/fan-in shape, generalized to the four `RoutingStrategy` variants
//! and to the consensus engine for the consensus case.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::consensus::ConsensusEngine;
use crate::domain::models::{InputType, Proposal, Task, TokenUsage};
use crate::domain::ports::{AgentInvoker, DecisionRepository, ProposalRepository};
use crate::identifiers::AgentId;

use super::types::{AgentOutcome, WorkflowStep};

/// What an executor needs to run one stage: the agent invoker, the
/// assignee order picked by routing, and the raw inputs to pass through.
pub struct ExecutionContext<'a> {
    pub invoker: &'a dyn AgentInvoker,
    pub assignees: &'a [AgentId],
    pub inputs: Value,
    /// Upper bound a consensus executor waits for stragglers before
    /// deciding on whatever proposals arrived (spec.md §4.9).
    pub consensus_wait: Duration,
}

#[async_trait]
pub trait WorkflowExecutor: Send + Sync {
    async fn execute(&self, task: &Task, ctx: &ExecutionContext<'_>) -> (WorkflowStep, TokenUsage);
}

fn token_totals(outcomes: &[AgentOutcome]) -> TokenUsage {
    outcomes.iter().fold(TokenUsage::default(), |acc, o| acc + o.token_usage)
}

async fn invoke_one(invoker: &dyn AgentInvoker, task: &Task, agent_id: AgentId, inputs: &Value) -> AgentOutcome {
    match invoker.invoke(agent_id, task, inputs).await {
        Ok(outcome) => AgentOutcome {
            agent_id,
            output: outcome.output,
            confidence: outcome.confidence,
            token_usage: outcome.token_usage,
            error: outcome.error,
        },
        Err(err) => AgentOutcome {
            agent_id,
            output: String::new(),
            confidence: 0.0,
            token_usage: TokenUsage::default(),
            error: Some(err.to_string()),
        },
    }
}

/// Invoke the primary agent once; its outcome is the workflow's outcome.
pub struct SoloExecutor;

#[async_trait]
impl WorkflowExecutor for SoloExecutor {
    async fn execute(&self, task: &Task, ctx: &ExecutionContext<'_>) -> (WorkflowStep, TokenUsage) {
        let Some(&primary) = ctx.assignees.first() else {
            return (
                WorkflowStep::Failure { error: "no assignee for solo execution".to_string() },
                TokenUsage::default(),
            );
        };
        let outcome = invoke_one(ctx.invoker, task, primary, &ctx.inputs).await;
        let tokens = outcome.token_usage;
        let step = match outcome.error {
            Some(error) => WorkflowStep::Failure { error },
            None => {
                let mut artifacts = HashMap::new();
                artifacts.insert("confidence".to_string(), Value::from(outcome.confidence));
                WorkflowStep::Success { output: outcome.output, artifacts }
            }
        };
        (step, tokens)
    }
}

/// Chain agents in assignee order; each stage receives the prior stage's
/// output as its `previous_output` input. The first failure aborts the
/// chain.
pub struct SequentialExecutor;

#[async_trait]
impl WorkflowExecutor for SequentialExecutor {
    async fn execute(&self, task: &Task, ctx: &ExecutionContext<'_>) -> (WorkflowStep, TokenUsage) {
        if ctx.assignees.is_empty() {
            return (
                WorkflowStep::Failure { error: "no assignees for sequential execution".to_string() },
                TokenUsage::default(),
            );
        }

        let mut inputs = ctx.inputs.clone();
        let mut totals = TokenUsage::default();
        let mut last_output = String::new();

        for &agent_id in ctx.assignees {
            let outcome = invoke_one(ctx.invoker, task, agent_id, &inputs).await;
            totals = totals + outcome.token_usage;
            if let Some(error) = outcome.error {
                return (
                    WorkflowStep::Failure { error: format!("stage {agent_id} failed: {error}") },
                    totals,
                );
            }
            last_output = outcome.output.clone();
            if let Value::Object(ref mut map) = inputs {
                map.insert("previous_output".to_string(), Value::String(outcome.output));
            } else {
                inputs = serde_json::json!({ "previous_output": outcome.output });
            }
        }

        let mut artifacts = HashMap::new();
        artifacts.insert("stage_count".to_string(), Value::from(ctx.assignees.len()));
        (WorkflowStep::Success { output: last_output, artifacts }, totals)
    }
}

/// Fan out to every participant concurrently; success iff every outcome
/// succeeded, otherwise failure names the agents that errored.
pub struct ParallelExecutor;

#[async_trait]
impl WorkflowExecutor for ParallelExecutor {
    async fn execute(&self, task: &Task, ctx: &ExecutionContext<'_>) -> (WorkflowStep, TokenUsage) {
        if ctx.assignees.is_empty() {
            return (
                WorkflowStep::Failure { error: "no assignees for parallel execution".to_string() },
                TokenUsage::default(),
            );
        }

        let futures = ctx.assignees.iter().map(|&agent_id| invoke_one(ctx.invoker, task, agent_id, &ctx.inputs));
        let outcomes: Vec<AgentOutcome> = futures::future::join_all(futures).await;
        let totals = token_totals(&outcomes);

        let failing: Vec<&AgentOutcome> = outcomes.iter().filter(|o| !o.is_success()).collect();
        if !failing.is_empty() {
            let reasons: Vec<String> = failing
                .iter()
                .map(|o| format!("{}: {}", o.agent_id, o.error.as_deref().unwrap_or("unknown error")))
                .collect();
            return (WorkflowStep::Failure { error: reasons.join("; ") }, totals);
        }

        let mut artifacts = HashMap::new();
        for outcome in &outcomes {
            artifacts.insert(outcome.agent_id.to_string(), Value::String(outcome.output.clone()));
        }
        let combined = outcomes.iter().map(|o| o.output.as_str()).collect::<Vec<_>>().join("\n---\n");
        (WorkflowStep::Success { output: combined, artifacts }, totals)
    }
}

/// Invoke all participants concurrently, submit each as a proposal, then
/// ask the consensus engine to decide once every outcome is in or
/// `consensus_wait` elapses, whichever is first.
pub struct ConsensusExecutor<P, D> {
    pub engine: Arc<ConsensusEngine<P, D>>,
}

#[async_trait]
impl<P, D> WorkflowExecutor for ConsensusExecutor<P, D>
where
    P: ProposalRepository,
    D: DecisionRepository,
{
    async fn execute(&self, task: &Task, ctx: &ExecutionContext<'_>) -> (WorkflowStep, TokenUsage) {
        if ctx.assignees.is_empty() {
            return (
                WorkflowStep::Failure { error: "no assignees for consensus execution".to_string() },
                TokenUsage::default(),
            );
        }

        let fanout = async {
            let futures = ctx.assignees.iter().map(|&agent_id| invoke_one(ctx.invoker, task, agent_id, &ctx.inputs));
            futures::future::join_all(futures).await
        };

        let outcomes: Vec<AgentOutcome> = match tokio::time::timeout(ctx.consensus_wait, fanout).await {
            Ok(outcomes) => outcomes,
            Err(_) => Vec::new(),
        };
        let totals = token_totals(&outcomes);

        for outcome in outcomes.iter().filter(|o| o.is_success()) {
            let proposal = Proposal::new(
                task.id,
                outcome.agent_id,
                InputType::Text,
                outcome.output.clone(),
                outcome.confidence,
                outcome.token_usage,
            );
            if let Err(err) = self.engine.submit(&proposal).await {
                return (WorkflowStep::Failure { error: err.to_string() }, totals);
            }
        }

        match self.engine.decide(task.id).await {
            Ok(decision) if decision.consensus_achieved => {
                let proposals = match self.engine.proposals_for(task.id).await {
                    Ok(p) => p,
                    Err(err) => return (WorkflowStep::Failure { error: err.to_string() }, totals),
                };
                let winner = decision
                    .winner_id
                    .and_then(|id| proposals.into_iter().find(|p| p.id == id));
                match winner {
                    Some(winning) => {
                        let mut artifacts = HashMap::new();
                        artifacts.insert("agreement_rate".to_string(), Value::from(decision.agreement_rate));
                        artifacts.insert("winner_agent_id".to_string(), Value::String(winning.agent_id.to_string()));
                        (WorkflowStep::Success { output: winning.content, artifacts }, totals)
                    }
                    None => (WorkflowStep::Failure { error: "consensus achieved but no winner resolved".to_string() }, totals),
                }
            }
            Ok(decision) => (
                WorkflowStep::Failure {
                    error: format!("no consensus: agreement rate {:.2} below threshold", decision.agreement_rate),
                },
                totals,
            ),
            Err(err) => (WorkflowStep::Failure { error: err.to_string() }, totals),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TaskType;
    use crate::domain::ports::MockAgentInvoker;

    fn sample_task() -> Task {
        Task::new("demo", TaskType::Implementation, 3, 3)
    }

    #[tokio::test]
    async fn solo_executor_fails_without_assignees() {
        let invoker = MockAgentInvoker::new("ok", 0.9);
        let ctx = ExecutionContext {
            invoker: &invoker,
            assignees: &[],
            inputs: Value::Null,
            consensus_wait: Duration::from_millis(50),
        };
        let (step, _) = SoloExecutor.execute(&sample_task(), &ctx).await;
        assert!(matches!(step, WorkflowStep::Failure { .. }));
    }

    #[tokio::test]
    async fn solo_executor_succeeds_with_primary_assignee() {
        let invoker = MockAgentInvoker::new("done", 0.9);
        let assignees = [AgentId::new()];
        let ctx = ExecutionContext {
            invoker: &invoker,
            assignees: &assignees,
            inputs: Value::Null,
            consensus_wait: Duration::from_millis(50),
        };
        let (step, _) = SoloExecutor.execute(&sample_task(), &ctx).await;
        assert!(matches!(step, WorkflowStep::Success { .. }));
    }

    #[tokio::test]
    async fn parallel_executor_fails_if_any_agent_errors() {
        let failing_agent = AgentId::new();
        struct FlakyInvoker {
            failing_agent: AgentId,
        }
        #[async_trait]
        impl AgentInvoker for FlakyInvoker {
            async fn invoke(
                &self,
                agent_id: AgentId,
                _task: &Task,
                _inputs: &Value,
            ) -> crate::domain::errors::OrchestratorResult<crate::domain::ports::AgentInvocationOutcome> {
                if agent_id == self.failing_agent {
                    Ok(crate::domain::ports::AgentInvocationOutcome {
                        output: String::new(),
                        confidence: 0.0,
                        token_usage: TokenUsage::default(),
                        error: Some("boom".to_string()),
                    })
                } else {
                    Ok(crate::domain::ports::AgentInvocationOutcome {
                        output: "ok".to_string(),
                        confidence: 0.8,
                        token_usage: TokenUsage::default(),
                        error: None,
                    })
                }
            }
        }
        let invoker = FlakyInvoker { failing_agent };
        let assignees = [AgentId::new(), failing_agent];
        let ctx = ExecutionContext {
            invoker: &invoker,
            assignees: &assignees,
            inputs: Value::Null,
            consensus_wait: Duration::from_millis(50),
        };
        let (step, _) = ParallelExecutor.execute(&sample_task(), &ctx).await;
        assert!(matches!(step, WorkflowStep::Failure { .. }));
    }

    #[tokio::test]
    async fn sequential_executor_chains_previous_output() {
        let invoker = MockAgentInvoker::new("stage-output", 0.9);
        let assignees = [AgentId::new(), AgentId::new()];
        let ctx = ExecutionContext {
            invoker: &invoker,
            assignees: &assignees,
            inputs: serde_json::json!({}),
            consensus_wait: Duration::from_millis(50),
        };
        let (step, _) = SequentialExecutor.execute(&sample_task(), &ctx).await;
        assert!(matches!(step, WorkflowStep::Success { .. }));
    }
}
