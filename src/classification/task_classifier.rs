//! Pure-function task classifier: `text -> {complexity, risk,
//! critical_keywords, confidence}` (spec.md §4.3).

use std::time::Instant;

const ARCHITECTURE_VOCAB: &[&str] = &["architecture", "integration", "migration", "refactor", "redesign", "rearchitect"];

const CRITICAL_KEYWORDS: &[&str] = &[
    "auth", "oauth", "jwt", "payment", "encryption", "security", "pii", "compliance", "production", "rollout",
];

/// The result of classifying free text into routing-relevant signals.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// 1–10.
    pub complexity: u8,
    /// 1–10.
    pub risk: u8,
    pub critical_keywords: Vec<String>,
    /// 0.0–1.0.
    pub confidence: f64,
}

/// Classify `text`. Spec.md §4.3 requires this to complete in under 50ms
/// for inputs up to 2KB; this is pure arithmetic over the text with no I/O,
/// so that bound holds by construction, and the debug build still asserts
/// it so a future change to this function trips CI rather than production.
#[must_use]
pub fn classify(text: &str) -> Classification {
    let started = Instant::now();
    let lowered = text.to_lowercase();
    let sentence_count = lowered.matches(|c| c == '.' || c == '!' || c == '?').count().max(1);
    let word_count = lowered.split_whitespace().count();

    let mut signals = 0u32;

    let mut complexity = 1.0_f64;
    complexity += (word_count as f64 / 40.0).min(4.0);
    if word_count > 0 {
        signals += 1;
    }
    complexity += (sentence_count as f64 / 3.0).min(2.0);
    if sentence_count > 1 {
        signals += 1;
    }
    let arch_hits = ARCHITECTURE_VOCAB.iter().filter(|w| lowered.contains(*w)).count();
    if arch_hits > 0 {
        complexity += 3.0 + (arch_hits as f64 - 1.0).max(0.0);
        signals += 1;
    }

    let critical_keywords: Vec<String> = CRITICAL_KEYWORDS
        .iter()
        .filter(|kw| lowered.contains(*kw))
        .map(|kw| (*kw).to_string())
        .collect();

    let mut risk = 1.0_f64;
    risk += (word_count as f64 / 60.0).min(2.0);
    if word_count > 0 {
        signals += 1;
    }
    if !critical_keywords.is_empty() {
        risk += 4.0 + (critical_keywords.len() as f64 - 1.0).max(0.0);
        signals += 1;
    }

    let confidence = (signals as f64 / 5.0).clamp(0.0, 1.0);

    debug_assert!(
        started.elapsed().as_millis() < 50 || text.len() > 2048,
        "task classification exceeded the 50ms budget for a <=2KB input"
    );

    Classification {
        complexity: clamp_scale(complexity),
        risk: clamp_scale(risk),
        critical_keywords,
        confidence,
    }
}

fn clamp_scale(value: f64) -> u8 {
    value.round().clamp(1.0, 10.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_plain_text_is_low_complexity_and_low_risk() {
        let c = classify("Fix a typo in the README.");
        assert!(c.complexity <= 3);
        assert!(c.risk <= 3);
        assert!(c.critical_keywords.is_empty());
    }

    #[test]
    fn architecture_vocabulary_raises_complexity() {
        let c = classify("We need a full architecture migration and refactor of the integration layer.");
        assert!(c.complexity >= 6);
    }

    #[test]
    fn security_keywords_raise_risk_and_are_reported() {
        let c = classify("Update the OAuth and JWT handling for production rollout.");
        assert!(c.risk >= 6);
        assert!(c.critical_keywords.contains(&"oauth".to_string()));
        assert!(c.critical_keywords.contains(&"jwt".to_string()));
    }

    #[test]
    fn scales_are_always_within_bounds() {
        let c = classify("");
        assert!((1..=10).contains(&c.complexity));
        assert!((1..=10).contains(&c.risk));
        let c2 = classify(&"security payment encryption compliance production rollout pii auth. ".repeat(50));
        assert!((1..=10).contains(&c2.complexity));
        assert!((1..=10).contains(&c2.risk));
    }
}
