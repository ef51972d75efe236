//! Consensus engine: proposal intake, agreement-rate computation, and
//! winner selection (spec.md §4.9).
//!
//! Grounded on the teacher's `services/swarm_orchestrator/dag_execution.rs`
//! per-agent-outcome-map-to-single-result reduction shape, generalized from
//! task-execution outcomes to proposal fingerprint buckets.

use std::collections::HashMap;

use crate::domain::errors::OrchestratorResult;
use crate::domain::models::{Decision, Proposal};
use crate::domain::ports::{DecisionRepository, ProposalRepository};
use crate::identifiers::{AgentId, TaskId};

/// Threshold at or above which agreement counts as consensus (spec.md
/// §4.9: `consensusAchieved := agreementRate >= 0.5`).
pub const CONSENSUS_THRESHOLD: f64 = 0.5;

/// Bucket `proposals` by content fingerprint and return the agreement rate
/// (size of the largest bucket divided by the total count) alongside the
/// proposals in that largest bucket. An empty input has agreement rate 0.
#[must_use]
pub fn largest_agreeing_bucket(proposals: &[Proposal]) -> (f64, Vec<&Proposal>) {
    if proposals.is_empty() {
        return (0.0, Vec::new());
    }
    let mut buckets: HashMap<String, Vec<&Proposal>> = HashMap::new();
    for proposal in proposals {
        buckets.entry(proposal.content_fingerprint()).or_default().push(proposal);
    }
    let largest = buckets
        .into_values()
        .max_by_key(Vec::len)
        .expect("at least one bucket when proposals is non-empty");
    let rate = largest.len() as f64 / proposals.len() as f64;
    (rate, largest)
}

/// Choose the winner among a bucket of agreeing proposals: highest
/// confidence, ties broken by earliest `created_at`, then by smaller
/// `agent_id` (spec.md §4.9).
#[must_use]
pub fn select_winner<'a>(bucket: &[&'a Proposal]) -> Option<&'a Proposal> {
    bucket
        .iter()
        .copied()
        .max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.agent_id.to_string().cmp(&a.agent_id.to_string()))
        })
}

/// The result of reconciling a task's proposals, independent of
/// persistence.
#[derive(Debug, Clone)]
pub struct ConsensusOutcome {
    pub agreement_rate: f64,
    pub consensus_achieved: bool,
    pub winner: Option<Proposal>,
    pub considered: Vec<Proposal>,
    pub selected: Vec<Proposal>,
    pub rationale: String,
}

/// Pure reconciliation over an in-memory proposal set (spec.md §4.9).
#[must_use]
pub fn reconcile(proposals: Vec<Proposal>) -> ConsensusOutcome {
    if proposals.is_empty() {
        return ConsensusOutcome {
            agreement_rate: 0.0,
            consensus_achieved: false,
            winner: None,
            considered: Vec::new(),
            selected: Vec::new(),
            rationale: "no proposals submitted".to_string(),
        };
    }

    let (agreement_rate, bucket) = largest_agreeing_bucket(&proposals);
    let winner = select_winner(&bucket).cloned();
    let consensus_achieved = agreement_rate >= CONSENSUS_THRESHOLD;
    let selected: Vec<Proposal> = bucket.into_iter().cloned().collect();

    let rationale = match &winner {
        Some(w) => format!(
            "{:.0}% of {} proposals agreed on the winning fingerprint; agent {} selected (confidence {:.2})",
            agreement_rate * 100.0,
            proposals.len(),
            w.agent_id,
            w.confidence
        ),
        None => "no agreeing bucket could be formed".to_string(),
    };

    ConsensusOutcome {
        agreement_rate,
        consensus_achieved,
        winner,
        considered: proposals,
        selected,
        rationale,
    }
}

/// Orchestrates proposal intake against the repositories and produces a
/// persisted [`Decision`] once all expected proposals are in (or the
/// workflow runtime's consensus-wait timeout elapses and calls
/// [`ConsensusEngine::decide`] with whatever arrived).
pub struct ConsensusEngine<P, D> {
    proposals: P,
    decisions: D,
}

impl<P, D> ConsensusEngine<P, D>
where
    P: ProposalRepository,
    D: DecisionRepository,
{
    pub fn new(proposals: P, decisions: D) -> Self {
        Self { proposals, decisions }
    }

    /// Idempotent intake on `(task_id, agent_id)` — delegated entirely to
    /// the repository's `ON CONFLICT DO NOTHING` semantics (spec.md §4.9).
    pub async fn submit(&self, proposal: &Proposal) -> OrchestratorResult<()> {
        self.proposals.insert(proposal).await
    }

    /// Reconcile every proposal submitted so far for `task_id` and persist
    /// the resulting [`Decision`] atomically with its considered list.
    pub async fn decide(&self, task_id: TaskId) -> OrchestratorResult<Decision> {
        let proposals = self.proposals.find_by_task(task_id).await?;
        let outcome = reconcile(proposals);

        let decision = Decision {
            id: crate::identifiers::DecisionId::new(),
            task_id,
            considered: outcome.considered.iter().map(|p| p.id).collect(),
            selected: outcome.selected.iter().map(|p| p.id).collect(),
            winner_id: outcome.winner.as_ref().map(|p| p.id),
            agreement_rate: outcome.agreement_rate,
            rationale: outcome.rationale,
            decided_at: chrono::Utc::now(),
            consensus_achieved: outcome.consensus_achieved,
        };
        self.decisions.insert(&decision).await?;
        Ok(decision)
    }

    pub async fn proposals_for(&self, task_id: TaskId) -> OrchestratorResult<Vec<Proposal>> {
        self.proposals.find_by_task(task_id).await
    }

    pub async fn has_proposal_from(&self, task_id: TaskId, agent_id: AgentId) -> OrchestratorResult<bool> {
        Ok(self.proposals.find_one(task_id, agent_id).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{InputType, TokenUsage};
    use crate::identifiers::AgentId;

    fn proposal(task_id: TaskId, content: &str, confidence: f64) -> Proposal {
        Proposal::new(task_id, AgentId::new(), InputType::Text, content, confidence, TokenUsage::default())
    }

    #[test]
    fn scenario_three_agents_agree() {
        let task_id = TaskId::new();
        let proposals = vec![
            proposal(task_id, "standard implementation", 0.9),
            proposal(task_id, "standard implementation", 0.9),
            proposal(task_id, "standard implementation", 0.9),
        ];
        let outcome = reconcile(proposals);
        assert_eq!(outcome.agreement_rate, 1.0);
        assert!(outcome.consensus_achieved);
        assert!(outcome.winner.is_some());
    }

    #[test]
    fn winner_ties_broken_by_earliest_created_at() {
        let task_id = TaskId::new();
        let mut first = proposal(task_id, "x", 0.9);
        let mut second = proposal(task_id, "x", 0.9);
        first.created_at = chrono::Utc::now() - chrono::Duration::seconds(10);
        second.created_at = chrono::Utc::now();
        let bucket = vec![&second, &first];
        let winner = select_winner(&bucket).unwrap();
        assert_eq!(winner.created_at, first.created_at);
    }

    #[test]
    fn no_agreement_below_half_is_not_consensus() {
        let task_id = TaskId::new();
        let proposals = vec![
            proposal(task_id, "approach a", 0.9),
            proposal(task_id, "approach b", 0.8),
            proposal(task_id, "approach c", 0.7),
        ];
        let outcome = reconcile(proposals);
        assert!(outcome.agreement_rate < 0.5);
        assert!(!outcome.consensus_achieved);
    }

    #[test]
    fn empty_proposals_has_zero_agreement_and_no_winner() {
        let outcome = reconcile(Vec::new());
        assert_eq!(outcome.agreement_rate, 0.0);
        assert!(outcome.winner.is_none());
    }
}
