//! Performance analytics: per-strategy duration and success-rate tracking.
//!
//! Grounded on the teacher's `services/budget_tracker.rs` accumulate-then-
//! derive shape (`report_*` mutates running state, query methods read a
//! snapshot), adapted from budget-pressure windows to per-[`RoutingStrategy`]
//! counters. Feeds [`crate::classification::strategy_picker::StrategyMetrics`]
//! so the strategy picker's calibrator (spec.md §4.4) can react to observed
//! outcomes rather than running blind.

use dashmap::DashMap;

use crate::classification::strategy_picker::StrategyMetrics;
use crate::domain::models::RoutingStrategy;
use crate::workflow::WorkflowResult;

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    runs: u32,
    successes: u32,
    total_duration_ms: u64,
}

/// Running per-strategy performance counters. Engine-scoped (spec.md §9).
#[derive(Default)]
pub struct PerformanceAnalytics {
    by_strategy: DashMap<RoutingStrategy, Accumulator>,
}

impl PerformanceAnalytics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed [`WorkflowResult`] against `strategy`.
    pub fn record(&self, strategy: RoutingStrategy, result: &WorkflowResult) {
        let succeeded = matches!(result.step, crate::workflow::WorkflowStep::Success { .. });
        let duration_ms = result.duration().num_milliseconds().max(0) as u64;
        let mut entry = self.by_strategy.entry(strategy).or_default();
        entry.runs += 1;
        if succeeded {
            entry.successes += 1;
        }
        entry.total_duration_ms += duration_ms;
    }

    #[must_use]
    pub fn success_rate(&self, strategy: RoutingStrategy) -> Option<f64> {
        self.by_strategy.get(&strategy).and_then(|entry| {
            if entry.runs == 0 {
                None
            } else {
                Some(f64::from(entry.successes) / f64::from(entry.runs))
            }
        })
    }

    #[must_use]
    pub fn mean_duration_ms(&self, strategy: RoutingStrategy) -> Option<f64> {
        self.by_strategy.get(&strategy).and_then(|entry| {
            if entry.runs == 0 {
                None
            } else {
                Some(entry.total_duration_ms as f64 / f64::from(entry.runs))
            }
        })
    }

    #[must_use]
    pub fn run_count(&self, strategy: RoutingStrategy) -> u32 {
        self.by_strategy.get(&strategy).map_or(0, |entry| entry.runs)
    }

    /// Snapshot the accumulated counters into a [`StrategyMetrics`] the
    /// strategy picker's calibrator can consume directly.
    #[must_use]
    pub fn to_strategy_metrics(&self) -> StrategyMetrics {
        let mut metrics = StrategyMetrics::default();
        for entry in &self.by_strategy {
            let strategy = *entry.key();
            let accumulator = *entry.value();
            for _ in 0..accumulator.successes {
                metrics.record(strategy, true);
            }
            for _ in 0..(accumulator.runs - accumulator.successes) {
                metrics.record(strategy, false);
            }
        }
        metrics
    }

    pub fn reset(&self) {
        self.by_strategy.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::TaskId;
    use crate::workflow::WorkflowStep;
    use chrono::Utc;

    fn result(step: WorkflowStep) -> WorkflowResult {
        let started_at = Utc::now();
        WorkflowResult {
            task_id: TaskId::new(),
            step,
            token_totals: Default::default(),
            started_at,
            ended_at: started_at + chrono::Duration::milliseconds(40),
        }
    }

    #[test]
    fn success_rate_reflects_recorded_outcomes() {
        let analytics = PerformanceAnalytics::new();
        analytics.record(RoutingStrategy::Solo, &result(WorkflowStep::Success { output: String::new(), artifacts: Default::default() }));
        analytics.record(RoutingStrategy::Solo, &result(WorkflowStep::Failure { error: "x".to_string() }));
        assert_eq!(analytics.success_rate(RoutingStrategy::Solo), Some(0.5));
        assert_eq!(analytics.run_count(RoutingStrategy::Solo), 2);
    }

    #[test]
    fn unrecorded_strategy_has_no_rate() {
        let analytics = PerformanceAnalytics::new();
        assert_eq!(analytics.success_rate(RoutingStrategy::Parallel), None);
    }

    #[test]
    fn snapshot_feeds_strategy_metrics_sample_counts() {
        let analytics = PerformanceAnalytics::new();
        for _ in 0..6 {
            analytics.record(RoutingStrategy::Consensus, &result(WorkflowStep::Success { output: String::new(), artifacts: Default::default() }));
        }
        let metrics = analytics.to_strategy_metrics();
        assert_eq!(metrics.sample_count(RoutingStrategy::Consensus), 6);
    }
}
