//! Agent proposal: one agent's candidate output for a task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::{AgentId, ProposalId, TaskId};

/// The shape of a proposal's content, mirroring the agent invocation
/// contract's input/output typing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    Text,
    Diff,
    Plan,
    Review,
}

/// Token usage reported by an agent invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
}

impl TokenUsage {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input + self.output
    }
}

impl std::ops::Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, rhs: TokenUsage) -> TokenUsage {
        TokenUsage {
            input: self.input + rhs.input,
            output: self.output + rhs.output,
        }
    }
}

/// A candidate response from one agent for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub input_type: InputType,
    pub content: String,
    /// Clamped to [0,1] on construction.
    pub confidence: f64,
    pub token_usage: TokenUsage,
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    #[must_use]
    pub fn new(
        task_id: TaskId,
        agent_id: AgentId,
        input_type: InputType,
        content: impl Into<String>,
        confidence: f64,
        token_usage: TokenUsage,
    ) -> Self {
        Self {
            id: ProposalId::new(),
            task_id,
            agent_id,
            input_type,
            content: content.into(),
            confidence: confidence.clamp(0.0, 1.0),
            token_usage,
            created_at: Utc::now(),
        }
    }

    /// A deterministic fingerprint of the canonicalized content, used to
    /// bucket proposals for agreement-rate computation (spec.md §4.9).
    #[must_use]
    pub fn content_fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let canonical = canonicalize(&self.content);
        let digest = Sha256::digest(canonical.as_bytes());
        format!("{digest:x}")
    }
}

/// Canonicalize content for fingerprinting: trim, collapse internal
/// whitespace runs, lowercase. This is intentionally coarse — it exists to
/// let semantically-identical proposals agree even with incidental
/// formatting differences, not to perform semantic diffing.
fn canonicalize(content: &str) -> String {
    content
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_ignores_whitespace_and_case_differences() {
        let a = Proposal::new(
            TaskId::new(),
            AgentId::new(),
            InputType::Text,
            "Do   The Thing",
            0.9,
            TokenUsage::default(),
        );
        let b = Proposal::new(
            TaskId::new(),
            AgentId::new(),
            InputType::Text,
            "do the thing",
            0.5,
            TokenUsage::default(),
        );
        assert_eq!(a.content_fingerprint(), b.content_fingerprint());
    }

    #[test]
    fn fingerprint_differs_for_different_content() {
        let a = Proposal::new(TaskId::new(), AgentId::new(), InputType::Text, "a", 0.5, TokenUsage::default());
        let b = Proposal::new(TaskId::new(), AgentId::new(), InputType::Text, "b", 0.5, TokenUsage::default());
        assert_ne!(a.content_fingerprint(), b.content_fingerprint());
    }

    #[test]
    fn confidence_is_clamped() {
        let p = Proposal::new(TaskId::new(), AgentId::new(), InputType::Text, "x", 5.0, TokenUsage::default());
        assert_eq!(p.confidence, 1.0);
    }
}
