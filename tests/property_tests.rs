//! Crate-level property tests for spec.md §8's quantified invariants that
//! don't fit naturally as a single module's unit test: T8 (directive
//! parser idempotence) and T9 (identifier validation window), run over
//! generated inputs via `proptest` rather than hand-picked examples.

use orchestrator_kernel::classification::parse_directive;
use orchestrator_kernel::identifiers::{AgentId, TaskId};
use orchestrator_kernel::registry::AgentRegistry;
use proptest::prelude::*;

fn directive_text() -> impl Strategy<Value = String> {
    let words = prop::collection::vec(
        prop::sample::select(vec![
            "please",
            "we",
            "need",
            "consensus",
            "on",
            "this",
            "skip",
            "review",
            "just",
            "implement",
            "it",
            "solo",
            "emergency",
            "asap",
            "production",
            "is",
            "down",
            "assign",
            "to",
            "reviewer-bot",
            "don't",
            "ship",
            "without",
            "testing",
            "get",
            "everyone's",
            "input",
        ]),
        0..12,
    );
    words.prop_map(|w| w.join(" "))
}

proptest! {
    /// T8: `parse(parse(x).original_text) == parse(x)` — the parser is a
    /// pure function of its input text, so re-parsing the text it already
    /// echoed back must reproduce every signal it derived the first time.
    #[test]
    fn directive_parser_is_idempotent(text in directive_text()) {
        let registry = AgentRegistry::new(vec![
            orchestrator_kernel::domain::models::Agent::new("reviewer-bot", "test"),
        ]);
        let first = parse_directive(&text, &registry);
        let second = parse_directive(&first.original_text, &registry);

        prop_assert_eq!(first.original_text.clone(), second.original_text.clone());
        prop_assert_eq!(first.force_consensus.value, second.force_consensus.value);
        prop_assert_eq!(first.prevent_consensus.value, second.prevent_consensus.value);
        prop_assert_eq!(first.is_emergency.value, second.is_emergency.value);
        prop_assert!((first.force_consensus.confidence - second.force_consensus.confidence).abs() < 1e-9);
        prop_assert!((first.prevent_consensus.confidence - second.prevent_consensus.confidence).abs() < 1e-9);
        prop_assert_eq!(first.assigned_agents, second.assigned_agents);
        prop_assert_eq!(first.assign_to_agent, second.assign_to_agent);
    }

    /// T9: every freshly minted identifier round-trips through its bare
    /// encoded form and its prefixed `Display`/`FromStr` form, and its
    /// decoded timestamp always lies in the accepted window (it was
    /// stamped with "now").
    #[test]
    fn fresh_identifiers_round_trip_and_validate(_seed in any::<u64>()) {
        let task_id = TaskId::new();
        let reparsed = TaskId::parse(&task_id.encoded()).expect("freshly minted id must validate");
        prop_assert_eq!(task_id, reparsed);

        let displayed = task_id.to_string();
        let from_display: TaskId = displayed.parse().expect("prefixed form must parse");
        prop_assert_eq!(task_id, from_display);

        prop_assert_eq!(task_id.encoded().len(), 26);
    }

    /// T9 (rejection side): strings that aren't 26 characters, or that
    /// contain characters outside the Crockford base32 alphabet, are never
    /// accepted as identifiers.
    #[test]
    fn malformed_identifier_strings_are_rejected(s in "[a-zA-Z0-9!@#*]{0,40}") {
        if s.len() != 26 || !s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            prop_assert!(AgentId::parse(&s).is_err());
        }
    }
}
