//! Free-text directive parsing: `text -> UserDirective` (spec.md §4.2).
//!
//! No NLP crate in the teacher's stack covers this; grounded in the
//! teacher's plain pure-function service style (e.g.
//! `services/priority_calculator.rs`) — a deterministic, rule-table-driven
//! function rather than a model call.

use crate::domain::models::{Signal, UserDirective};
use crate::identifiers::AgentId;
use crate::registry::AgentRegistry;

const FORCE_CONSENSUS_PHRASES: &[(&str, f64)] = &[
    ("need consensus", 0.6),
    ("needs consensus", 0.6),
    ("require consensus", 0.6),
    ("requires consensus", 0.6),
    ("get consensus", 0.6),
    ("want everyone to weigh in", 0.5),
    ("get everyone's input", 0.5),
    ("need agreement", 0.5),
    ("second opinion", 0.4),
    ("get input from", 0.4),
    ("multiple agents", 0.4),
];

const PREVENT_CONSENSUS_PHRASES: &[(&str, f64)] = &[
    ("skip consensus", 0.6),
    ("no consensus", 0.6),
    ("just implement", 0.5),
    ("just do it", 0.5),
    ("solo", 0.4),
    ("skip review", 0.5),
    ("ship it", 0.3),
];

const EMERGENCY_PHRASES: &[&str] = &[
    "emergency",
    "asap",
    "urgent",
    "sev0",
    "sev1",
    "production down",
    "production is down",
    "prod is down",
    "critical outage",
    "hotfix now",
];

/// Phrases that open a six-token negation window over whatever follows
/// them (spec.md §4.2 step 1).
const NEGATION_TRIGGERS: &[&str] = &["don't", "do not", "dont", "without", "skip", "never", "avoid", "no "];

const NEGATION_WINDOW_TOKENS: usize = 6;

/// Words that must never resolve to an agent mention even if they happen
/// to equal a registered display name (spec.md §4.2 step 4).
const AGENT_MENTION_EXCLUSIONS: &[&str] = &["user", "it", "this", "that", "agent", "input", "team"];

const MAX_PARSING_NOTES: usize = 25;
const FUZZY_MAX_DISTANCE: usize = 2;
const FUZZY_MIN_RATIO: f64 = 0.75;

/// Parse free text into a [`UserDirective`], resolving agent mentions
/// against `registry`.
#[must_use]
pub fn parse(text: &str, registry: &AgentRegistry) -> UserDirective {
    let mut directive = UserDirective::neutral(text);
    let lowered = text.to_lowercase();
    let tokens = tokenize(&lowered);
    let negated = negation_mask(&tokens);

    let mut force_score = 0.0_f64;
    let mut prevent_score = 0.0_f64;

    for &(phrase, weight) in FORCE_CONSENSUS_PHRASES {
        if let Some(start) = find_phrase_token_start(&tokens, phrase) {
            if negated.get(start).copied().unwrap_or(false) {
                prevent_score += weight;
                directive.push_note(format!("negated force phrase '{phrase}' counted as prevent"));
            } else {
                force_score += weight;
                directive.push_note(format!("matched force phrase '{phrase}'"));
            }
        }
    }

    for &(phrase, weight) in PREVENT_CONSENSUS_PHRASES {
        if let Some(start) = find_phrase_token_start(&tokens, phrase) {
            if negated.get(start).copied().unwrap_or(false) {
                force_score += weight;
                directive.push_note(format!("negated prevent phrase '{phrase}' counted as force"));
            } else {
                prevent_score += weight;
                directive.push_note(format!("matched prevent phrase '{phrase}'"));
            }
        }
    }

    let mut is_emergency = false;
    for phrase in EMERGENCY_PHRASES {
        if lowered.contains(phrase) {
            is_emergency = true;
            directive.push_note(format!("matched emergency cue '{phrase}'"));
        }
    }
    let has_forcing_cue = force_score > 0.0;
    if is_emergency && !has_forcing_cue {
        prevent_score += 0.4;
    }

    let mentioned = resolve_agent_mentions(&lowered, registry, &mut directive);
    if mentioned.len() > 1 {
        force_score += 0.5;
        directive.push_note("multiple distinct agent mentions raise force_consensus".to_string());
    }
    directive.assigned_agents = mentioned.clone();
    directive.assign_to_agent = mentioned.first().copied();

    force_score = force_score.clamp(0.0, 1.0);
    prevent_score = prevent_score.clamp(0.0, 1.0);

    // Tie resolution (spec.md §4.2 step 5): both exceed 0.5 and differ by
    // < 0.1 -> neutral, but keep any resolved assignment. If emergency
    // holds and a forcing cue is present, keep force and clear prevent.
    // Re-test force_score > 0.0 here rather than reusing `has_forcing_cue`:
    // the multi-agent-mention boost above can turn a force-less directive
    // into one with a forcing cue.
    let has_forcing_cue = has_forcing_cue || force_score > 0.0;
    if is_emergency && has_forcing_cue {
        prevent_score = 0.0;
    } else if force_score >= 0.5 && prevent_score >= 0.5 && (force_score - prevent_score).abs() < 0.1 {
        directive.push_note("force/prevent confidences tied; clearing both to neutral".to_string());
        force_score = 0.0;
        prevent_score = 0.0;
    }

    directive.force_consensus = Signal::new(force_score > 0.0, force_score);
    directive.prevent_consensus = Signal::new(prevent_score > 0.0, prevent_score);
    directive.is_emergency = Signal::new(is_emergency, if is_emergency { 1.0 } else { 0.0 });

    while directive.parsing_notes.len() > MAX_PARSING_NOTES {
        directive.parsing_notes.pop();
    }
    directive
}

fn tokenize(lowered: &str) -> Vec<String> {
    lowered
        .split(|c: char| c.is_whitespace())
        .map(|w| w.trim_matches(|c: char| c.is_ascii_punctuation() && c != '\'').to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Which token indices fall inside a negation window opened by a trigger
/// phrase in `NEGATION_TRIGGERS`.
fn negation_mask(tokens: &[String]) -> Vec<bool> {
    let mut mask = vec![false; tokens.len()];
    for trigger in NEGATION_TRIGGERS {
        let trigger = trigger.trim();
        if trigger.is_empty() {
            continue;
        }
        if let Some(start) = find_phrase_token_start(tokens, trigger) {
            let phrase_len = trigger.split_whitespace().count().max(1);
            let window_start = start + phrase_len;
            let window_end = (window_start + NEGATION_WINDOW_TOKENS).min(mask.len());
            for slot in mask.iter_mut().take(window_end).skip(window_start) {
                *slot = true;
            }
        }
    }
    mask
}

/// Locate `phrase` (a space-joined sequence of one or more tokens) as a
/// contiguous subsequence of `tokens`, returning the starting token index.
fn find_phrase_token_start(tokens: &[String], phrase: &str) -> Option<usize> {
    let phrase_tokens: Vec<&str> = phrase.split_whitespace().collect();
    if phrase_tokens.is_empty() || phrase_tokens.len() > tokens.len() {
        return None;
    }
    tokens.windows(phrase_tokens.len()).position(|window| {
        window.iter().zip(phrase_tokens.iter()).all(|(a, b)| a == b)
    })
}

fn resolve_agent_mentions(lowered_text: &str, registry: &AgentRegistry, directive: &mut UserDirective) -> Vec<AgentId> {
    let mut found = Vec::new();
    let words: Vec<&str> = lowered_text.split_whitespace().collect();

    for agent in registry.all() {
        let display = agent.display_name.to_lowercase();
        if AGENT_MENTION_EXCLUSIONS.contains(&display.as_str()) {
            continue;
        }

        let id_str = agent.id.to_string().to_lowercase();
        let id_no_prefix = id_str.splitn(2, '-').nth(1).unwrap_or(&id_str).to_string();
        let at_mention = format!("@{id_no_prefix}");
        let id_no_hyphens = id_no_prefix.replace('-', "");

        let mut matched = lowered_text.contains(&at_mention)
            || lowered_text.contains(&id_no_prefix)
            || lowered_text.contains(&id_no_hyphens)
            || (!display.is_empty() && lowered_text.contains(&display));

        if !matched {
            matched = words.iter().any(|word| {
                let distance = damerau_levenshtein(word, &display);
                let max_len = word.len().max(display.len()).max(1);
                let ratio = 1.0 - (distance as f64 / max_len as f64);
                distance <= FUZZY_MAX_DISTANCE && ratio >= FUZZY_MIN_RATIO
            });
        }

        if matched {
            found.push(agent.id);
            directive.push_note(format!("resolved agent mention for '{}'", agent.display_name));
        }
    }
    found
}

/// Restricted (optimal string alignment) Damerau-Levenshtein distance.
pub(crate) fn damerau_levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (len_a, len_b) = (a.len(), b.len());
    if len_a == 0 {
        return len_b;
    }
    if len_b == 0 {
        return len_a;
    }

    let mut d = vec![vec![0usize; len_b + 1]; len_a + 1];
    for (i, row) in d.iter_mut().enumerate().take(len_a + 1) {
        row[0] = i;
    }
    for j in 0..=len_b {
        d[0][j] = j;
    }

    for i in 1..=len_a {
        for j in 1..=len_b {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            d[i][j] = (d[i - 1][j] + 1).min(d[i][j - 1] + 1).min(d[i - 1][j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                d[i][j] = d[i][j].min(d[i - 2][j - 2] + cost);
            }
        }
    }
    d[len_a][len_b]
}
