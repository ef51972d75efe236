//! Composes the directive parser, task classifier, strategy picker, and
//! agent selector into the single `(strategy, primary_agent_id,
//! participant_agent_ids, metadata)` routing decision spec.md's glossary
//! defines and §2's data flow hands to the workflow runtime.

use std::collections::HashMap;

use crate::classification::{agent_selector, directive_parser, strategy_picker, task_classifier};
use crate::domain::errors::OrchestratorResult;
use crate::domain::models::{RoutingStrategy, Task, UserDirective};
use crate::identifiers::AgentId;
use crate::registry::AgentRegistry;

/// The outcome of the routing pipeline, ready to be merged into a task's
/// metadata and handed to the workflow runtime.
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    pub strategy: RoutingStrategy,
    pub primary_agent_id: AgentId,
    pub participant_agent_ids: Vec<AgentId>,
    pub metadata: HashMap<String, String>,
}

/// Run the full pipeline: parse the directive, classify the task text,
/// pick a strategy, and select agents for it.
pub fn route(
    task: &Task,
    directive_text: &str,
    registry: &AgentRegistry,
    thresholds: &strategy_picker::StrategyThresholds,
) -> OrchestratorResult<RoutingDecision> {
    let directive = directive_parser::parse(directive_text, registry);
    let classification = task_classifier::classify(task.description.as_deref().unwrap_or(&task.title));
    let choice = strategy_picker::pick(task, &directive, Some(&classification), thresholds);
    let agents = agent_selector::select(task, &directive, choice.strategy, registry)?;

    let primary_agent_id = agents[0].id;
    let participant_agent_ids: Vec<AgentId> = agents.iter().map(|a| a.id).collect();

    let mut metadata = HashMap::new();
    metadata.insert("routing.rule".to_string(), choice.rule.to_string());
    metadata.insert("routing.strategy".to_string(), choice.strategy.as_str().to_string());
    metadata.insert("routing.complexity".to_string(), classification.complexity.to_string());
    metadata.insert("routing.risk".to_string(), classification.risk.to_string());
    metadata.insert(
        "routing.critical_keywords".to_string(),
        classification.critical_keywords.join(","),
    );

    Ok(RoutingDecision {
        strategy: choice.strategy,
        primary_agent_id,
        participant_agent_ids,
        metadata,
    })
}

/// Build a routing decision from an already-parsed directive, skipping the
/// parse step — used when the caller already holds a [`UserDirective`]
/// (e.g. a resumed workflow re-routing without re-parsing free text).
pub fn route_with_directive(
    task: &Task,
    directive: &UserDirective,
    registry: &AgentRegistry,
    thresholds: &strategy_picker::StrategyThresholds,
) -> OrchestratorResult<RoutingDecision> {
    let classification = task_classifier::classify(task.description.as_deref().unwrap_or(&task.title));
    let choice = strategy_picker::pick(task, directive, Some(&classification), thresholds);
    let agents = agent_selector::select(task, directive, choice.strategy, registry)?;

    let primary_agent_id = agents[0].id;
    let participant_agent_ids: Vec<AgentId> = agents.iter().map(|a| a.id).collect();

    let mut metadata = HashMap::new();
    metadata.insert("routing.rule".to_string(), choice.rule.to_string());
    metadata.insert("routing.strategy".to_string(), choice.strategy.as_str().to_string());

    Ok(RoutingDecision {
        strategy: choice.strategy,
        primary_agent_id,
        participant_agent_ids,
        metadata,
    })
}
