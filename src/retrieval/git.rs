//! Git-history retrieval provider wrapper: surfaces recent commits and
//! co-changed files as synthetic snippets (spec.md §4.11).

use std::collections::HashMap;

use crate::domain::errors::OrchestratorResult;
use crate::domain::ports::GitHistoryProvider;

use super::{ContextSnippet, SnippetSource};

/// For one in-scope path, fetch recent commits and co-changed files from
/// `provider` and render them as synthetic snippets tagged
/// `type=commit|co-changed` in metadata.
pub async fn snippets_for_path<G>(provider: &G, relative_path: &str, limit: usize) -> OrchestratorResult<Vec<ContextSnippet>>
where
    G: GitHistoryProvider,
{
    let mut snippets = Vec::new();

    for commit in provider.recent_commits(relative_path, limit).await? {
        let mut metadata = HashMap::new();
        metadata.insert("type".to_string(), "commit".to_string());
        metadata.insert("sha".to_string(), commit.sha.clone());
        metadata.insert("author".to_string(), commit.author.clone());
        let content = format!("{} ({})", commit.summary, commit.sha);
        snippets.push(ContextSnippet {
            source: SnippetSource::GitCommit,
            relative_path: relative_path.to_string(),
            chunk_id: None,
            ordinal: None,
            content: content.clone(),
            score: 0.5,
            token_estimate: crate::domain::models::chunk::estimate_tokens(&content),
            metadata,
        });
    }

    for co_changed in provider.co_changed_files(relative_path, limit).await? {
        let mut metadata = HashMap::new();
        metadata.insert("type".to_string(), "co-changed".to_string());
        metadata.insert("co_change_count".to_string(), co_changed.co_change_count.to_string());
        let content = format!("{} changes together with {} ({} times)", relative_path, co_changed.relative_path, co_changed.co_change_count);
        snippets.push(ContextSnippet {
            source: SnippetSource::GitCoChanged,
            relative_path: co_changed.relative_path.clone(),
            chunk_id: None,
            ordinal: None,
            content: content.clone(),
            score: 0.4,
            token_estimate: crate::domain::models::chunk::estimate_tokens(&content),
            metadata,
        });
    }

    Ok(snippets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockGitHistoryProvider;

    #[tokio::test]
    async fn mock_provider_yields_no_snippets() {
        let snippets = snippets_for_path(&MockGitHistoryProvider, "src/lib.rs", 5).await.unwrap();
        assert!(snippets.is_empty());
    }
}
