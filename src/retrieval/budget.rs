//! Token-budget truncation: emit snippets in order until the cumulative
//! `token_estimate` would exceed the budget's remaining allowance (spec.md
//! §4.11 "Token budget", T7).

use super::ContextSnippet;

/// The slice of an overall token budget available to retrieval snippets,
/// separate from whatever the caller reserves for the directive, task
/// description, or agent system prompt.
#[derive(Debug, Clone, Copy)]
pub struct TokenBudget {
    pub available_for_snippets: u32,
}

impl TokenBudget {
    #[must_use]
    pub fn new(available_for_snippets: u32) -> Self {
        Self { available_for_snippets }
    }
}

/// Walk `snippets` in their given order, accumulating `token_estimate`
/// (falling back to `crate::domain::models::chunk::estimate_tokens` when a
/// snippet's own estimate is zero) and stopping — without including the
/// snippet that would push the running total over budget.
#[must_use]
pub fn truncate_to_budget(snippets: Vec<ContextSnippet>, budget: &TokenBudget) -> Vec<ContextSnippet> {
    let mut out = Vec::with_capacity(snippets.len());
    let mut spent: u64 = 0;
    let cap = u64::from(budget.available_for_snippets);

    for snippet in snippets {
        let estimate = if snippet.token_estimate > 0 {
            u64::from(snippet.token_estimate)
        } else {
            u64::from(crate::domain::models::chunk::estimate_tokens(&snippet.content))
        };
        if spent + estimate > cap {
            break;
        }
        spent += estimate;
        out.push(snippet);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::SnippetSource;
    use std::collections::HashMap;

    fn snippet(token_estimate: u32) -> ContextSnippet {
        ContextSnippet {
            source: SnippetSource::Vector,
            relative_path: "a.rs".to_string(),
            chunk_id: None,
            ordinal: None,
            content: "x".repeat(token_estimate as usize * 4),
            score: 0.5,
            token_estimate,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn stops_before_exceeding_budget() {
        let snippets = vec![snippet(40), snippet(40), snippet(40)];
        let budget = TokenBudget::new(100);
        let truncated = truncate_to_budget(snippets, &budget);
        assert_eq!(truncated.len(), 2);
        let total: u32 = truncated.iter().map(|s| s.token_estimate).sum();
        assert!(total <= 100);
    }

    #[test]
    fn keeps_all_when_under_budget() {
        let snippets = vec![snippet(10), snippet(10)];
        let budget = TokenBudget::new(1000);
        assert_eq!(truncate_to_budget(snippets, &budget).len(), 2);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(truncate_to_budget(Vec::new(), &TokenBudget::new(100)).is_empty());
    }

    #[test]
    fn zero_budget_admits_nothing() {
        let snippets = vec![snippet(1)];
        assert!(truncate_to_budget(snippets, &TokenBudget::new(0)).is_empty());
    }
}
