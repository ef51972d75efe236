//! Select which agent(s) carry out a routed task (spec.md §4.5).

use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::models::{Agent, AgentStatus, Capability, RoutingStrategy, Task, UserDirective};
use crate::registry::AgentRegistry;

/// Default consensus panel size when the directive names no specific agents.
pub const DEFAULT_CONSENSUS_PANEL_SIZE: usize = 3;
pub const MIN_CONSENSUS_PANEL_SIZE: usize = 2;

/// The capability a task's type is best served by, used when no capability
/// is explicit in the task's metadata.
fn required_capability(task: &Task) -> Capability {
    for capability in [
        Capability::CodeGeneration,
        Capability::Review,
        Capability::Testing,
        Capability::Architecture,
        Capability::Documentation,
        Capability::Debugging,
        Capability::Planning,
    ] {
        if capability.task_type_affinity().contains(&task.task_type) {
            return capability;
        }
    }
    Capability::CodeGeneration
}

/// Agents eligible for `task`: online or busy (never offline), and
/// advertising the capability the task's type calls for.
fn eligible_pool(task: &Task, registry: &AgentRegistry) -> Vec<Agent> {
    let capability = required_capability(task);
    registry
        .by_capability(capability)
        .into_iter()
        .filter(|agent| agent.status != AgentStatus::Offline)
        .collect()
}

/// Rank agents best-first: online beats busy, then higher recent success
/// rate, then registration order (stable sort) as the final tie-break
/// (spec.md §4.5).
fn rank(mut pool: Vec<Agent>) -> Vec<Agent> {
    pool.sort_by(|a, b| {
        b.status
            .rank()
            .cmp(&a.status.rank())
            .then(b.recent_success_rate.partial_cmp(&a.recent_success_rate).unwrap_or(std::cmp::Ordering::Equal))
    });
    pool
}

/// Select the agent(s) a task should be routed to, given the strategy the
/// strategy picker chose.
///
/// - `Solo`: honors `directive.assign_to_agent` if that agent is online (or
///   busy) and capability-matched; otherwise falls back to the best-ranked
///   eligible agent.
/// - `Consensus`: the top `panel_size` eligible agents (default
///   [`DEFAULT_CONSENSUS_PANEL_SIZE`], floor [`MIN_CONSENSUS_PANEL_SIZE`]),
///   preferring any agents the directive explicitly named.
/// - `Sequential` / `Parallel`: same eligible-pool ranking as consensus; the
///   workflow runtime decides how many of the returned agents it actually
///   dispatches to and in what order.
pub fn select(
    task: &Task,
    directive: &UserDirective,
    strategy: RoutingStrategy,
    registry: &AgentRegistry,
) -> OrchestratorResult<Vec<Agent>> {
    let pool = eligible_pool(task, registry);
    if pool.is_empty() {
        return Err(OrchestratorError::NoEligibleAgent {
            task_id: task.id.to_string(),
            reason: format!("no online or busy agent advertises {:?}", required_capability(task)),
        });
    }
    let ranked = rank(pool);

    match strategy {
        RoutingStrategy::Solo => select_solo(directive, &ranked),
        RoutingStrategy::Consensus | RoutingStrategy::Sequential | RoutingStrategy::Parallel => {
            Ok(select_panel(directive, &ranked, DEFAULT_CONSENSUS_PANEL_SIZE))
        }
    }
}

fn select_solo(directive: &UserDirective, ranked: &[Agent]) -> OrchestratorResult<Vec<Agent>> {
    if let Some(requested) = directive.assign_to_agent {
        if let Some(agent) = ranked.iter().find(|a| a.id == requested) {
            return Ok(vec![agent.clone()]);
        }
        tracing::info!(
            requested_agent = %requested,
            "assign_to_agent not eligible, falling back to best-ranked agent"
        );
    }
    Ok(vec![ranked[0].clone()])
}

fn select_panel(directive: &UserDirective, ranked: &[Agent], default_size: usize) -> Vec<Agent> {
    let panel_size = default_size.max(MIN_CONSENSUS_PANEL_SIZE).min(ranked.len());

    let mut panel: Vec<Agent> = Vec::with_capacity(panel_size);
    for requested in &directive.assigned_agents {
        if panel.len() >= panel_size {
            break;
        }
        if let Some(agent) = ranked.iter().find(|a| a.id == *requested) {
            if !panel.iter().any(|existing| existing.id == agent.id) {
                panel.push(agent.clone());
            }
        }
    }
    for agent in ranked {
        if panel.len() >= panel_size {
            break;
        }
        if !panel.iter().any(|existing| existing.id == agent.id) {
            panel.push(agent.clone());
        }
    }
    panel
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TaskType;

    fn agent(name: &str, status: AgentStatus, success_rate: f64, caps: &[Capability]) -> Agent {
        let mut a = Agent::new(name, "test").with_capabilities(caps.iter().copied());
        a.status = status;
        a.recent_success_rate = success_rate;
        a
    }

    #[test]
    fn solo_honors_assign_to_agent_when_eligible() {
        let reviewer = agent("reviewer", AgentStatus::Online, 1.0, &[Capability::Review]);
        let other = agent("other", AgentStatus::Online, 1.0, &[Capability::Review]);
        let registry = AgentRegistry::new([reviewer.clone(), other]);
        let task = Task::new("review this", TaskType::Review, 3, 3);
        let mut directive = UserDirective::neutral("assign to reviewer");
        directive.assign_to_agent = Some(reviewer.id);

        let chosen = select(&task, &directive, RoutingStrategy::Solo, &registry).unwrap();
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].id, reviewer.id);
    }

    #[test]
    fn solo_falls_back_when_assigned_agent_is_offline() {
        let offline = agent("offline-reviewer", AgentStatus::Offline, 1.0, &[Capability::Review]);
        let online = agent("online-reviewer", AgentStatus::Online, 0.8, &[Capability::Review]);
        let registry = AgentRegistry::new([offline.clone(), online.clone()]);
        let task = Task::new("review this", TaskType::Review, 3, 3);
        let mut directive = UserDirective::neutral("assign to offline-reviewer");
        directive.assign_to_agent = Some(offline.id);

        let chosen = select(&task, &directive, RoutingStrategy::Solo, &registry).unwrap();
        assert_eq!(chosen[0].id, online.id);
    }

    #[test]
    fn solo_picks_best_ranked_when_no_assignment_given() {
        let low = agent("low", AgentStatus::Busy, 0.4, &[Capability::Review]);
        let high = agent("high", AgentStatus::Online, 0.9, &[Capability::Review]);
        let registry = AgentRegistry::new([low, high.clone()]);
        let task = Task::new("review this", TaskType::Review, 3, 3);
        let directive = UserDirective::neutral("review this please");

        let chosen = select(&task, &directive, RoutingStrategy::Solo, &registry).unwrap();
        assert_eq!(chosen[0].id, high.id);
    }

    #[test]
    fn consensus_returns_default_panel_size() {
        let agents: Vec<Agent> = (0..5)
            .map(|i| agent(&format!("reviewer-{i}"), AgentStatus::Online, 0.5, &[Capability::Review]))
            .collect();
        let registry = AgentRegistry::new(agents);
        let task = Task::new("review this", TaskType::Review, 3, 3);
        let directive = UserDirective::neutral("need consensus from the team");

        let chosen = select(&task, &directive, RoutingStrategy::Consensus, &registry).unwrap();
        assert_eq!(chosen.len(), DEFAULT_CONSENSUS_PANEL_SIZE);
    }

    #[test]
    fn consensus_panel_shrinks_to_fit_a_small_pool() {
        let agents = vec![agent("solo-reviewer", AgentStatus::Online, 0.5, &[Capability::Review])];
        let registry = AgentRegistry::new(agents);
        let task = Task::new("review this", TaskType::Review, 3, 3);
        let directive = UserDirective::neutral("need consensus from the team");

        let chosen = select(&task, &directive, RoutingStrategy::Consensus, &registry).unwrap();
        assert_eq!(chosen.len(), 1);
    }

    #[test]
    fn no_eligible_agent_is_an_error() {
        let registry = AgentRegistry::new([]);
        let task = Task::new("review this", TaskType::Review, 3, 3);
        let directive = UserDirective::neutral("review this please");

        let err = select(&task, &directive, RoutingStrategy::Solo, &registry).unwrap_err();
        assert!(matches!(err, OrchestratorError::NoEligibleAgent { .. }));
    }
}
