//! Concurrent agent registry: an id index, a capability index, and
//! atomically-replaceable per-agent status (spec.md §4.6).
//!
//! Grounded on the teacher's choice of `dashmap` for concurrent lookup
//! tables (see DESIGN.md) generalized from a single repository-style map
//! to the id+capability dual index this spec calls for.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::models::{Agent, AgentStatus, Capability};
use crate::identifiers::AgentId;

/// External collaborator boundary for liveness probing (spec.md §4.6).
/// Any error from `check` collapses the agent to `Offline`.
#[async_trait]
pub trait HealthChecker: Send + Sync {
    async fn check(&self, agent: &Agent) -> anyhow::Result<AgentStatus>;
}

/// Thread-safe registry of agents, loaded once from configuration. The
/// capability index's *shape* is fixed at construction (spec.md §4.6: "no
/// agent add/remove from the core"); only status mutates afterward.
pub struct AgentRegistry {
    by_id: DashMap<AgentId, Agent>,
    by_capability: DashMap<Capability, Vec<AgentId>>,
}

impl AgentRegistry {
    /// Build a registry from a fixed set of agents, e.g. loaded from
    /// configuration at startup. Reconfiguration is a full rebuild
    /// (construct a new registry), never an in-place add/remove.
    #[must_use]
    pub fn new(agents: impl IntoIterator<Item = Agent>) -> Self {
        let by_id = DashMap::new();
        let by_capability: DashMap<Capability, Vec<AgentId>> = DashMap::new();
        for agent in agents {
            for capability in &agent.capabilities {
                by_capability.entry(*capability).or_default().push(agent.id);
            }
            by_id.insert(agent.id, agent);
        }
        Self { by_id, by_capability }
    }

    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<Agent> {
        self.by_id.get(&id).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn all(&self) -> Vec<Agent> {
        self.by_id.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Agents advertising `capability`, in registration order.
    #[must_use]
    pub fn by_capability(&self, capability: Capability) -> Vec<Agent> {
        self.by_capability
            .get(&capability)
            .map(|ids| ids.iter().filter_map(|id| self.get(*id)).collect())
            .unwrap_or_default()
    }

    /// Atomically replace one agent's status. A no-op if the id is unknown.
    pub fn set_status(&self, id: AgentId, status: AgentStatus) {
        if let Some(mut entry) = self.by_id.get_mut(&id) {
            entry.status = status;
        }
    }

    pub fn set_recent_success_rate(&self, id: AgentId, rate: f64) {
        if let Some(mut entry) = self.by_id.get_mut(&id) {
            entry.recent_success_rate = rate.clamp(0.0, 1.0);
        }
    }

    /// Run `checker` against a stable snapshot of all registered agents,
    /// updating each one's status. A checker error (not a returned status)
    /// collapses that agent to `Offline` (spec.md §4.6).
    pub async fn run_health_checks(&self, checker: &dyn HealthChecker) {
        let snapshot = self.all();
        for agent in snapshot {
            let status = match checker.check(&agent).await {
                Ok(status) => status,
                Err(_) => AgentStatus::Offline,
            };
            self.set_status(agent.id, status);
        }
    }

    #[must_use]
    pub fn capabilities_covered(&self) -> HashSet<Capability> {
        self.by_capability.iter().map(|entry| *entry.key()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_agent(name: &str, caps: &[Capability]) -> Agent {
        Agent::new(name, "test-model").with_capabilities(caps.iter().copied())
    }

    #[test]
    fn capability_index_reflects_construction() {
        let a = sample_agent("reviewer", &[Capability::Review]);
        let b = sample_agent("coder", &[Capability::CodeGeneration]);
        let registry = AgentRegistry::new([a.clone(), b.clone()]);

        let reviewers = registry.by_capability(Capability::Review);
        assert_eq!(reviewers.len(), 1);
        assert_eq!(reviewers[0].id, a.id);
    }

    #[test]
    fn set_status_is_visible_through_get() {
        let a = sample_agent("reviewer", &[Capability::Review]);
        let registry = AgentRegistry::new([a.clone()]);
        registry.set_status(a.id, AgentStatus::Offline);
        assert_eq!(registry.get(a.id).unwrap().status, AgentStatus::Offline);
    }

    struct AlwaysErrChecker;

    #[async_trait]
    impl HealthChecker for AlwaysErrChecker {
        async fn check(&self, _agent: &Agent) -> anyhow::Result<AgentStatus> {
            Err(anyhow::anyhow!("probe failed"))
        }
    }

    #[tokio::test]
    async fn health_check_failure_collapses_to_offline() {
        let a = sample_agent("reviewer", &[Capability::Review]);
        let registry = AgentRegistry::new([a.clone()]);
        registry.run_health_checks(&AlwaysErrChecker).await;
        assert_eq!(registry.get(a.id).unwrap().status, AgentStatus::Offline);
    }
}
