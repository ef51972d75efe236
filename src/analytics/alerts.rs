//! Alert thresholds over the other analytics accumulators (spec.md §2
//! "alert thresholds").
//!
//! Grounded on the teacher's `services/budget_tracker.rs`
//! `BudgetTrackerConfig` (named threshold fields, a pure `level_from_pct`-
//! style classifier) — generalized from budget-consumption pressure levels
//! to the orchestration kernel's own health signals: strategy success rate,
//! consensus agreement rate, and per-task token spend.

use crate::domain::models::RoutingStrategy;
use crate::identifiers::TaskId;

use super::decisions::DecisionAnalytics;
use super::performance::PerformanceAnalytics;
use super::tokens::TokenAnalytics;

/// Named thresholds an operator tunes; defaults are conservative enough to
/// avoid flagging a freshly-started engine with too few samples.
#[derive(Debug, Clone, Copy)]
pub struct AlertThresholds {
    /// Below this success rate (with enough samples), a strategy is flagged.
    pub min_strategy_success_rate: f64,
    /// Minimum completed runs before a strategy's success rate is judged.
    pub min_samples_for_success_alert: u32,
    /// Below this mean agreement rate (with enough decisions), flag low
    /// consensus quality.
    pub min_mean_agreement_rate: f64,
    pub min_decisions_for_agreement_alert: u32,
    /// A single task's token total at or above this value is flagged.
    pub max_tokens_per_task: u64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            min_strategy_success_rate: 0.5,
            min_samples_for_success_alert: 5,
            min_mean_agreement_rate: 0.4,
            min_decisions_for_agreement_alert: 5,
            max_tokens_per_task: 200_000,
        }
    }
}

/// One alert condition that fired, naming the signal that crossed its
/// threshold and the observed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    LowStrategySuccessRate { strategy: RoutingStrategy, observed: f64, threshold: f64 },
    LowConsensusAgreement { observed: f64, threshold: f64 },
    TaskTokenBudgetExceeded { task_id: TaskId, observed: u64, threshold: u64 },
}

/// Evaluate every strategy's success rate against `thresholds`, appending an
/// [`Alert::LowStrategySuccessRate`] for any strategy with enough samples
/// whose rate has fallen below the floor.
#[must_use]
pub fn check_strategy_success_rates(performance: &PerformanceAnalytics, thresholds: &AlertThresholds) -> Vec<Alert> {
    [RoutingStrategy::Solo, RoutingStrategy::Consensus, RoutingStrategy::Sequential, RoutingStrategy::Parallel]
        .into_iter()
        .filter_map(|strategy| {
            if performance.run_count(strategy) < thresholds.min_samples_for_success_alert {
                return None;
            }
            let observed = performance.success_rate(strategy)?;
            if observed < thresholds.min_strategy_success_rate {
                Some(Alert::LowStrategySuccessRate { strategy, observed, threshold: thresholds.min_strategy_success_rate })
            } else {
                None
            }
        })
        .collect()
}

/// Check aggregate consensus agreement quality against `thresholds`.
#[must_use]
pub fn check_consensus_agreement(decisions: &DecisionAnalytics, thresholds: &AlertThresholds) -> Option<Alert> {
    if decisions.decision_count() < thresholds.min_decisions_for_agreement_alert {
        return None;
    }
    let observed = decisions.mean_agreement_rate()?;
    if observed < thresholds.min_mean_agreement_rate {
        Some(Alert::LowConsensusAgreement { observed, threshold: thresholds.min_mean_agreement_rate })
    } else {
        None
    }
}

/// Check one task's recorded token spend against `thresholds`.
#[must_use]
pub fn check_task_token_budget(tokens: &TokenAnalytics, task_id: TaskId, thresholds: &AlertThresholds) -> Option<Alert> {
    let observed = tokens.for_task(task_id).total();
    if observed >= thresholds.max_tokens_per_task {
        Some(Alert::TaskTokenBudgetExceeded { task_id, observed, threshold: thresholds.max_tokens_per_task })
    } else {
        None
    }
}
