//! Decision analytics: aggregate consensus-quality statistics across every
//! [`Decision`] the consensus engine has produced.
//!
//! Grounded on the teacher's `services/budget_tracker.rs` running-state
//! accumulator, narrowed to spec.md §2's "decision analytics" line.

use std::sync::Mutex;

use crate::domain::models::Decision;

#[derive(Debug, Clone, Default)]
struct Accumulator {
    decisions: u32,
    consensus_achieved: u32,
    agreement_rate_sum: f64,
}

/// Running consensus-quality counters. Engine-scoped (spec.md §9).
#[derive(Default)]
pub struct DecisionAnalytics {
    inner: Mutex<Accumulator>,
}

impl DecisionAnalytics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, decision: &Decision) {
        let mut inner = self.inner.lock().expect("decision analytics mutex poisoned");
        inner.decisions += 1;
        inner.agreement_rate_sum += decision.agreement_rate;
        if decision.consensus_achieved {
            inner.consensus_achieved += 1;
        }
    }

    /// Fraction of recorded decisions that reached consensus
    /// (`agreement_rate >= 0.5`, spec.md §4.9). `None` if nothing recorded.
    #[must_use]
    pub fn consensus_rate(&self) -> Option<f64> {
        let inner = self.inner.lock().expect("decision analytics mutex poisoned");
        if inner.decisions == 0 {
            None
        } else {
            Some(f64::from(inner.consensus_achieved) / f64::from(inner.decisions))
        }
    }

    #[must_use]
    pub fn mean_agreement_rate(&self) -> Option<f64> {
        let inner = self.inner.lock().expect("decision analytics mutex poisoned");
        if inner.decisions == 0 {
            None
        } else {
            Some(inner.agreement_rate_sum / f64::from(inner.decisions))
        }
    }

    #[must_use]
    pub fn decision_count(&self) -> u32 {
        self.inner.lock().expect("decision analytics mutex poisoned").decisions
    }

    pub fn reset(&self) {
        *self.inner.lock().expect("decision analytics mutex poisoned") = Accumulator::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{DecisionId, TaskId};
    use chrono::Utc;

    fn decision(agreement_rate: f64, consensus_achieved: bool) -> Decision {
        Decision {
            id: DecisionId::new(),
            task_id: TaskId::new(),
            considered: Vec::new(),
            selected: Vec::new(),
            winner_id: None,
            agreement_rate,
            rationale: "test".to_string(),
            decided_at: Utc::now(),
            consensus_achieved,
        }
    }

    #[test]
    fn consensus_rate_reflects_recorded_decisions() {
        let analytics = DecisionAnalytics::new();
        analytics.record(&decision(1.0, true));
        analytics.record(&decision(0.3, false));
        assert_eq!(analytics.consensus_rate(), Some(0.5));
        assert_eq!(analytics.decision_count(), 2);
    }

    #[test]
    fn empty_analytics_report_none() {
        let analytics = DecisionAnalytics::new();
        assert_eq!(analytics.consensus_rate(), None);
        assert_eq!(analytics.mean_agreement_rate(), None);
    }

    #[test]
    fn mean_agreement_rate_averages_across_decisions() {
        let analytics = DecisionAnalytics::new();
        analytics.record(&decision(1.0, true));
        analytics.record(&decision(0.0, false));
        assert_eq!(analytics.mean_agreement_rate(), Some(0.5));
    }
}
