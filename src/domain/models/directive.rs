//! Parsed user directive.

use serde::{Deserialize, Serialize};

use crate::identifiers::AgentId;

const MAX_PARSING_NOTES: usize = 25;

/// A boolean signal paired with the confidence the parser assigned it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub value: bool,
    pub confidence: f64,
}

impl Signal {
    #[must_use]
    pub fn new(value: bool, confidence: f64) -> Self {
        Self {
            value,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    #[must_use]
    pub fn neutral() -> Self {
        Self {
            value: false,
            confidence: 0.0,
        }
    }
}

/// The structured intent extracted from a user's free-text request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDirective {
    pub original_text: String,
    pub force_consensus: Signal,
    pub prevent_consensus: Signal,
    pub is_emergency: Signal,
    pub assign_to_agent: Option<AgentId>,
    pub assigned_agents: Vec<AgentId>,
    pub notes: Option<String>,
    pub parsing_notes: Vec<String>,
}

impl UserDirective {
    #[must_use]
    pub fn neutral(original_text: impl Into<String>) -> Self {
        Self {
            original_text: original_text.into(),
            force_consensus: Signal::neutral(),
            prevent_consensus: Signal::neutral(),
            is_emergency: Signal::neutral(),
            assign_to_agent: None,
            assigned_agents: Vec::new(),
            notes: None,
            parsing_notes: Vec::new(),
        }
    }

    pub fn push_note(&mut self, note: impl Into<String>) {
        if self.parsing_notes.len() < MAX_PARSING_NOTES {
            self.parsing_notes.push(note.into());
        }
    }

    /// Both force and prevent may never simultaneously hold with
    /// non-tied, non-neutral confidences (spec.md §3).
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        self.parsing_notes.len() <= MAX_PARSING_NOTES
            && !(self.force_consensus.value
                && self.prevent_consensus.value
                && (self.force_consensus.confidence - self.prevent_consensus.confidence).abs()
                    >= 0.1)
    }
}
