//! `(Task, UserDirective, Classification) -> RoutingStrategy` with
//! precedence rules and optional telemetry-driven calibration (spec.md
//! §4.4).

use std::collections::HashMap;

use crate::classification::task_classifier::{self, Classification};
use crate::domain::models::{RoutingStrategy, Task, TaskType, UserDirective};

const PARALLEL_CUES: &[&str] = &["in parallel", "fan out", "fan-out", "parallelize", "all at once"];

/// Tunable thresholds the precedence rules compare against. Calibration
/// adjusts these in place (spec.md §4.4).
#[derive(Debug, Clone, Copy)]
pub struct StrategyThresholds {
    pub force_consensus_threshold: f64,
    pub prevent_consensus_threshold: f64,
    pub high_risk_threshold: u8,
}

impl Default for StrategyThresholds {
    fn default() -> Self {
        Self {
            force_consensus_threshold: 0.5,
            prevent_consensus_threshold: 0.5,
            high_risk_threshold: 7,
        }
    }
}

/// Per-strategy success/total counters used to calibrate thresholds.
#[derive(Debug, Clone, Default)]
pub struct StrategyMetrics {
    counts: HashMap<RoutingStrategy, (u32, u32)>,
}

impl StrategyMetrics {
    pub fn record(&mut self, strategy: RoutingStrategy, succeeded: bool) {
        let entry = self.counts.entry(strategy).or_insert((0, 0));
        entry.1 += 1;
        if succeeded {
            entry.0 += 1;
        }
    }

    #[must_use]
    pub fn sample_count(&self, strategy: RoutingStrategy) -> u32 {
        self.counts.get(&strategy).map_or(0, |(_, total)| *total)
    }

    #[must_use]
    pub fn success_rate(&self, strategy: RoutingStrategy) -> Option<f64> {
        self.counts.get(&strategy).and_then(|(success, total)| {
            if *total == 0 {
                None
            } else {
                Some(f64::from(*success) / f64::from(*total))
            }
        })
    }
}

const MIN_SAMPLES_FOR_CALIBRATION: u32 = 5;

/// Adjust `thresholds` in place using `metrics`, and return whether a
/// calibration was actually applied. A no-op unless every strategy this
/// calibrator cares about — consensus and solo — has at least
/// [`MIN_SAMPLES_FOR_CALIBRATION`] observations (spec.md §4.4).
pub fn calibrate(thresholds: &mut StrategyThresholds, metrics: &StrategyMetrics) -> bool {
    let consensus_samples = metrics.sample_count(RoutingStrategy::Consensus);
    let solo_samples = metrics.sample_count(RoutingStrategy::Solo);
    if consensus_samples < MIN_SAMPLES_FOR_CALIBRATION || solo_samples < MIN_SAMPLES_FOR_CALIBRATION {
        return false;
    }

    let consensus_rate = metrics.success_rate(RoutingStrategy::Consensus).unwrap_or(0.5);
    let solo_rate = metrics.success_rate(RoutingStrategy::Solo).unwrap_or(0.5);

    // If solo is underperforming consensus, make consensus easier to
    // trigger (lower its threshold) and vice versa; nudge by a small,
    // bounded step so one calibration pass cannot swing behavior wildly.
    let calibration_error = consensus_rate - solo_rate;
    let step = (calibration_error * 0.1).clamp(-0.1, 0.1);
    thresholds.force_consensus_threshold = (thresholds.force_consensus_threshold - step).clamp(0.2, 0.8);
    true
}

/// The result of picking a strategy: the strategy itself plus the name of
/// the precedence rule that fired, for the audit line spec.md §4.4
/// requires.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingChoice {
    pub strategy: RoutingStrategy,
    pub rule: &'static str,
}

#[must_use]
pub fn pick(
    task: &Task,
    directive: &UserDirective,
    classification: Option<&Classification>,
    thresholds: &StrategyThresholds,
) -> RoutingChoice {
    let classification = classification
        .cloned()
        .unwrap_or_else(|| task_classifier::classify(task.description.as_deref().unwrap_or(&task.title)));

    let choice = pick_inner(task, directive, &classification, thresholds);
    tracing::info!(
        task_id = %task.id,
        rule = choice.rule,
        strategy = choice.strategy.as_str(),
        "strategy picker rule fired"
    );
    choice
}

fn pick_inner(
    task: &Task,
    directive: &UserDirective,
    classification: &Classification,
    thresholds: &StrategyThresholds,
) -> RoutingChoice {
    if directive.force_consensus.value && directive.force_consensus.confidence >= thresholds.force_consensus_threshold
    {
        return RoutingChoice { strategy: RoutingStrategy::Consensus, rule: "force_consensus" };
    }

    if directive.prevent_consensus.value
        && directive.prevent_consensus.confidence >= thresholds.prevent_consensus_threshold
    {
        return RoutingChoice { strategy: RoutingStrategy::Solo, rule: "prevent_consensus" };
    }

    if directive.is_emergency.value && !directive.force_consensus.value {
        return RoutingChoice { strategy: RoutingStrategy::Solo, rule: "emergency_no_force" };
    }

    let is_critical = !classification.critical_keywords.is_empty();

    if task.task_type == TaskType::Architecture && classification.complexity >= 7 && !is_critical {
        return RoutingChoice { strategy: RoutingStrategy::Sequential, rule: "architecture_high_complexity" };
    }

    if is_critical || classification.risk >= thresholds.high_risk_threshold {
        return RoutingChoice { strategy: RoutingStrategy::Consensus, rule: "critical_or_high_risk" };
    }

    let parallelizable_metadata = task.metadata.get("parallelizable").map(String::as_str) == Some("true");
    let parallel_cue = PARALLEL_CUES.iter().any(|cue| directive.original_text.to_lowercase().contains(cue));
    if parallelizable_metadata || parallel_cue {
        return RoutingChoice { strategy: RoutingStrategy::Parallel, rule: "parallelizable" };
    }

    RoutingChoice { strategy: RoutingStrategy::Solo, rule: "default_solo" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Signal;

    fn directive(text: &str) -> UserDirective {
        UserDirective::neutral(text)
    }

    fn task(task_type: TaskType, complexity: u8, risk: u8) -> Task {
        Task::new("t", task_type, complexity, risk)
    }

    #[test]
    fn scenario_force_consensus_on_low_risk_doc_task() {
        let t = task(TaskType::Documentation, 2, 2);
        let mut d = directive("We need consensus on this change");
        d.force_consensus = Signal::new(true, 0.8);
        let choice = pick(&t, &d, None, &StrategyThresholds::default());
        assert_eq!(choice.strategy, RoutingStrategy::Consensus);
    }

    #[test]
    fn scenario_emergency_bypass() {
        let t = task(TaskType::Bugfix, 8, 10);
        let mut d = directive("Emergency: production down. Skip review and ship");
        d.is_emergency = Signal::new(true, 1.0);
        d.prevent_consensus = Signal::new(true, 0.6);
        let choice = pick(&t, &d, None, &StrategyThresholds::default());
        assert_eq!(choice.strategy, RoutingStrategy::Solo);
    }

    #[test]
    fn architecture_high_complexity_prefers_sequential_when_not_critical() {
        let t = task(TaskType::Architecture, 8, 2);
        let d = directive("Plan the new subsystem architecture");
        let classification = Classification { complexity: 8, risk: 2, critical_keywords: vec![], confidence: 0.8 };
        let choice = pick(&t, &d, Some(&classification), &StrategyThresholds::default());
        assert_eq!(choice.strategy, RoutingStrategy::Sequential);
    }

    #[test]
    fn critical_keyword_forces_consensus_over_architecture_rule() {
        let t = task(TaskType::Architecture, 8, 9);
        let d = directive("Redesign the auth architecture");
        let classification =
            Classification { complexity: 8, risk: 9, critical_keywords: vec!["auth".to_string()], confidence: 0.9 };
        let choice = pick(&t, &d, Some(&classification), &StrategyThresholds::default());
        assert_eq!(choice.strategy, RoutingStrategy::Consensus);
    }

    #[test]
    fn calibration_is_noop_below_sample_threshold() {
        let mut thresholds = StrategyThresholds::default();
        let metrics = StrategyMetrics::default();
        assert!(!calibrate(&mut thresholds, &metrics));
    }

    #[test]
    fn calibration_applies_once_enough_samples_exist() {
        let mut thresholds = StrategyThresholds::default();
        let mut metrics = StrategyMetrics::default();
        for _ in 0..6 {
            metrics.record(RoutingStrategy::Consensus, true);
            metrics.record(RoutingStrategy::Solo, false);
        }
        assert!(calibrate(&mut thresholds, &metrics));
    }
}
