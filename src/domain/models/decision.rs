//! Consensus decision: the reconciled outcome of a set of proposals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::{DecisionId, ProposalId, TaskId};

/// The result of reconciling a set of proposals for a task.
///
/// A `Decision` references but does not own its considered proposals
/// (spec.md §3 ownership rules) — proposals remain owned by their task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: DecisionId,
    pub task_id: TaskId,
    pub considered: Vec<ProposalId>,
    pub selected: Vec<ProposalId>,
    pub winner_id: Option<ProposalId>,
    /// Fraction of `considered` sharing the modal content fingerprint.
    pub agreement_rate: f64,
    pub rationale: String,
    pub decided_at: DateTime<Utc>,
    pub consensus_achieved: bool,
}

impl Decision {
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        (0.0..=1.0).contains(&self.agreement_rate)
            && self.selected.iter().all(|s| self.considered.contains(s))
    }
}
