//! Task domain model.
//!
//! A task is the unit of work the engine routes to one or more agents. Its
//! status is mutated only through the workflow runtime, under the per-task
//! mutex, and only along the transitions in [`crate::state_machine`].

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::{AgentId, TaskId};

/// The kind of work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Implementation,
    Bugfix,
    Review,
    Testing,
    Documentation,
    Architecture,
    Research,
    Other,
}

impl TaskType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Implementation => "implementation",
            Self::Bugfix => "bugfix",
            Self::Review => "review",
            Self::Testing => "testing",
            Self::Documentation => "documentation",
            Self::Architecture => "architecture",
            Self::Research => "research",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "implementation" => Some(Self::Implementation),
            "bugfix" => Some(Self::Bugfix),
            "review" => Some(Self::Review),
            "testing" => Some(Self::Testing),
            "documentation" => Some(Self::Documentation),
            "architecture" => Some(Self::Architecture),
            "research" => Some(Self::Research),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Lifecycle status of a task. See [`crate::state_machine`] for the allowed
/// transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    WaitingInput,
    Completed,
    Failed,
}

impl TaskStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::WaitingInput => "waiting_input",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "waiting_input" => Some(Self::WaitingInput),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Completed and failed are terminal: no further transitions apply.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// The routing strategy chosen for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    Solo,
    Consensus,
    Sequential,
    Parallel,
}

impl RoutingStrategy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solo => "solo",
            Self::Consensus => "consensus",
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        }
    }
}

/// A discrete unit of work routed to one or more agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub strategy: Option<RoutingStrategy>,
    /// Ordered: the primary/first assignee is `assignees[0]`.
    pub assignees: Vec<AgentId>,
    pub dependencies: HashSet<TaskId>,
    /// 1–10, clamped at construction and on every mutation.
    pub complexity: u8,
    /// 1–10, clamped at construction and on every mutation.
    pub risk: u8,
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    #[must_use]
    pub fn new(title: impl Into<String>, task_type: TaskType, complexity: u8, risk: u8) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            title: title.into(),
            description: None,
            task_type,
            status: TaskStatus::Pending,
            strategy: None,
            assignees: Vec::new(),
            dependencies: HashSet::new(),
            complexity: clamp_scale(complexity),
            risk: clamp_scale(risk),
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Once a task has been routed, its assignee list must be non-empty.
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        let assignees_ok = self.strategy.is_none() || !self.assignees.is_empty();
        let scales_ok = (1..=10).contains(&self.complexity) && (1..=10).contains(&self.risk);
        assignees_ok && scales_ok
    }

    pub fn set_complexity(&mut self, value: u8) {
        self.complexity = clamp_scale(value);
    }

    pub fn set_risk(&mut self, value: u8) {
        self.risk = clamp_scale(value);
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn clamp_scale(value: u8) -> u8 {
    value.clamp(1, 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_clamps_out_of_range_scales() {
        let task = Task::new("x", TaskType::Bugfix, 0, 99);
        assert_eq!(task.complexity, 1);
        assert_eq!(task.risk, 10);
    }

    #[test]
    fn invariant_requires_assignees_once_routed() {
        let mut task = Task::new("x", TaskType::Bugfix, 5, 5);
        assert!(task.invariant_holds());
        task.strategy = Some(RoutingStrategy::Solo);
        assert!(!task.invariant_holds());
        task.assignees.push(AgentId::new());
        assert!(task.invariant_holds());
    }

    #[test]
    fn type_round_trips_through_as_str() {
        for t in [
            TaskType::Implementation,
            TaskType::Bugfix,
            TaskType::Review,
            TaskType::Testing,
            TaskType::Documentation,
            TaskType::Architecture,
            TaskType::Research,
            TaskType::Other,
        ] {
            assert_eq!(TaskType::from_str(t.as_str()), Some(t));
        }
    }
}
