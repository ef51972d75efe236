//! Agent domain model.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::identifiers::AgentId;

/// A capability an agent may offer; used by the selector to match a task's
/// requirement and by the registry's capability index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    CodeGeneration,
    Review,
    Testing,
    Architecture,
    Documentation,
    Debugging,
    Planning,
}

impl Capability {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodeGeneration => "code_generation",
            Self::Review => "review",
            Self::Testing => "testing",
            Self::Architecture => "architecture",
            Self::Documentation => "documentation",
            Self::Debugging => "debugging",
            Self::Planning => "planning",
        }
    }

    /// Static affinity between a capability and the task types it is best
    /// suited for, replacing the source's dynamic capability lookups
    /// (spec.md §9) with a fixed table.
    #[must_use]
    pub fn task_type_affinity(&self) -> &'static [crate::domain::models::task::TaskType] {
        use crate::domain::models::task::TaskType;
        match self {
            Self::CodeGeneration => &[TaskType::Implementation, TaskType::Bugfix],
            Self::Review => &[TaskType::Review],
            Self::Testing => &[TaskType::Testing],
            Self::Architecture => &[TaskType::Architecture],
            Self::Documentation => &[TaskType::Documentation],
            Self::Debugging => &[TaskType::Bugfix],
            Self::Planning => &[TaskType::Research, TaskType::Architecture],
        }
    }
}

/// Identifies the underlying model/provider an agent wraps (e.g. a distinct
/// Claude persona, a specialist prompt template). Opaque to the kernel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentType(pub String);

/// Health/availability status of an agent, mutated atomically by the
/// registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Online,
    Busy,
    Offline,
}

impl AgentStatus {
    /// Ordinal used to rank statuses online > busy > offline when breaking
    /// selection ties (spec.md §4.5).
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            Self::Online => 2,
            Self::Busy => 1,
            Self::Offline => 0,
        }
    }
}

/// A registered agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub agent_type: AgentType,
    pub display_name: String,
    pub status: AgentStatus,
    pub capabilities: HashSet<Capability>,
    pub strengths: Vec<String>,
    pub config: Option<serde_json::Value>,
    /// Fraction in [0,1] of recent invocations that succeeded; used by the
    /// selector to break status ties.
    pub recent_success_rate: f64,
}

impl Agent {
    #[must_use]
    pub fn new(display_name: impl Into<String>, agent_type: impl Into<String>) -> Self {
        Self {
            id: AgentId::new(),
            agent_type: AgentType(agent_type.into()),
            display_name: display_name.into(),
            status: AgentStatus::Online,
            capabilities: HashSet::new(),
            strengths: Vec::new(),
            config: None,
            recent_success_rate: 1.0,
        }
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities.extend(capabilities);
        self
    }

    #[must_use]
    pub fn has_capability(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }
}
