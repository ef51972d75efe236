//! Retrieval engine: multi-provider context search with hybrid fusion and
//! MMR re-ranking (spec.md §4.11).
//!
//! Grounded in the teacher's `rag_service.rs` (multi-provider query
//! composition) and `vector_store.rs` (cosine scoring, top-k).

pub mod budget;
pub mod fulltext;
pub mod fusion;
pub mod git;
pub mod mmr;
pub mod symbol;
pub mod vector;

use std::collections::HashMap;

use crate::domain::errors::OrchestratorResult;
use crate::domain::ports::{ContextRepository, Embedder, GitHistoryProvider};

pub use budget::{truncate_to_budget, TokenBudget};
pub use fusion::{reciprocal_rank_fusion, ProviderWeight};
pub use mmr::mmr_rerank;

/// Scope constraints narrowing a retrieval query (spec.md §4.11 filters).
#[derive(Debug, Clone, Default)]
pub struct ContextScope {
    pub language: Option<String>,
    pub kind: Option<crate::domain::models::ChunkKind>,
    pub path_prefix: Option<String>,
}

impl ContextScope {
    #[must_use]
    fn admits(&self, language: Option<&str>, kind: crate::domain::models::ChunkKind, path: &str) -> bool {
        if let Some(expected) = &self.language {
            if language != Some(expected.as_str()) {
                return false;
            }
        }
        if let Some(expected) = &self.kind {
            if *expected != kind {
                return false;
            }
        }
        if let Some(prefix) = &self.path_prefix {
            if !path.starts_with(prefix.as_str()) {
                return false;
            }
        }
        true
    }
}

/// What kind of source produced a [`ContextSnippet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetSource {
    Vector,
    FullText,
    Symbol,
    GitCommit,
    GitCoChanged,
    NeighborExpansion,
}

/// One ranked unit of retrieved context.
#[derive(Debug, Clone)]
pub struct ContextSnippet {
    pub source: SnippetSource,
    pub relative_path: String,
    pub chunk_id: Option<crate::identifiers::ChunkId>,
    pub ordinal: Option<u32>,
    pub content: String,
    pub score: f64,
    pub token_estimate: u32,
    pub metadata: HashMap<String, String>,
}

impl ContextSnippet {
    #[must_use]
    fn clamp_score(mut self) -> Self {
        self.score = self.score.clamp(0.0, 1.0);
        self
    }
}

/// Per-provider boosts applied multiplicatively after fusion (spec.md
/// §4.11 "Boosts").
#[derive(Debug, Clone, Default)]
pub struct BoostConfig {
    pub path_prefix_boosts: Vec<(String, f64)>,
    pub language_boosts: HashMap<String, f64>,
}

impl BoostConfig {
    #[must_use]
    fn boost_for(&self, relative_path: &str, language: Option<&str>) -> f64 {
        let mut factor = 1.0;
        for (prefix, boost) in &self.path_prefix_boosts {
            if relative_path.starts_with(prefix.as_str()) {
                factor *= boost;
            }
        }
        if let Some(language) = language {
            if let Some(boost) = self.language_boosts.get(language) {
                factor *= boost;
            }
        }
        factor
    }
}

/// Tunable knobs for one retrieval call.
#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    pub top_k: usize,
    pub vector_weight: f64,
    pub fulltext_weight: f64,
    pub symbol_weight: f64,
    pub git_weight: f64,
    pub boosts: BoostConfig,
    pub mmr_lambda: f64,
    pub neighbor_window: Option<u32>,
    pub use_idf: bool,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            vector_weight: 1.0,
            fulltext_weight: 0.75,
            symbol_weight: 0.85,
            git_weight: 0.3,
            boosts: BoostConfig::default(),
            mmr_lambda: 0.5,
            neighbor_window: None,
            use_idf: true,
        }
    }
}

/// Composes vector, full-text, and symbol search over the context
/// repository into one fused, re-ranked, budget-truncated snippet list.
pub struct RetrievalEngine<'a, R, E, G> {
    pub repository: &'a R,
    pub embedder: &'a E,
    pub git_history: &'a G,
}

impl<'a, R, E, G> RetrievalEngine<'a, R, E, G>
where
    R: ContextRepository,
    E: Embedder,
    G: GitHistoryProvider,
{
    /// Run the full query pipeline: provider search, fusion, boosts, MMR,
    /// neighbor expansion, and token-budget truncation.
    pub async fn query(
        &self,
        query_text: &str,
        scope: &ContextScope,
        budget: &TokenBudget,
        options: &RetrievalOptions,
    ) -> OrchestratorResult<Vec<ContextSnippet>> {
        let all_chunks = self.repository.all_chunks().await?;
        let all_file_states = self.repository.all_file_states().await?;
        let path_by_file: HashMap<_, _> = all_file_states.iter().map(|f| (f.file_id, f)).collect();

        let mut ranked_lists: Vec<(Vec<ContextSnippet>, f64)> = Vec::new();

        let vector_hits = vector::search(self.repository, self.embedder, query_text, scope, &path_by_file, options.top_k)
            .await?;
        if !vector_hits.is_empty() {
            ranked_lists.push((vector_hits, options.vector_weight));
        }

        let fulltext_hits =
            fulltext::search(&all_chunks, &path_by_file, query_text, scope, options.top_k, options.use_idf);
        if !fulltext_hits.is_empty() {
            ranked_lists.push((fulltext_hits, options.fulltext_weight));
        }

        let all_symbols = self.repository.all_symbols().await?;
        let symbol_hits = symbol::search(&all_symbols, &path_by_file, query_text, options.top_k);
        if !symbol_hits.is_empty() {
            ranked_lists.push((symbol_hits, options.symbol_weight));
        }

        // Git-history provider (spec.md §4.11): surfaces recent commits and
        // co-changed files for every path already judged in-scope by the
        // other providers, plus any path matching an explicit path-prefix
        // scope even if no other provider surfaced it.
        let mut git_candidate_paths: std::collections::HashSet<String> =
            ranked_lists.iter().flat_map(|(list, _)| list.iter().map(|s| s.relative_path.clone())).collect();
        if let Some(prefix) = &scope.path_prefix {
            git_candidate_paths.extend(
                all_file_states.iter().filter(|f| f.relative_path.starts_with(prefix.as_str())).map(|f| f.relative_path.clone()),
            );
        }
        let mut git_hits = Vec::new();
        for path in git_candidate_paths.iter().take(options.top_k) {
            git_hits.extend(git::snippets_for_path(self.git_history, path, options.top_k).await?);
        }
        if !git_hits.is_empty() {
            ranked_lists.push((git_hits, options.git_weight));
        }

        let fused = reciprocal_rank_fusion(&ranked_lists);
        let boosted: Vec<ContextSnippet> = fused
            .into_iter()
            .map(|mut snippet| {
                let language = snippet.metadata.get("language").map(String::as_str);
                snippet.score *= options.boosts.boost_for(&snippet.relative_path, language);
                snippet.clamp_score()
            })
            .collect();

        let vectors_by_chunk = vector::vectors_by_chunk(&self.repository.embeddings_by_model(self.embedder.model_name()).await?);
        let reranked = mmr_rerank(&boosted, &vectors_by_chunk, options.mmr_lambda, options.top_k);

        let expanded = match options.neighbor_window {
            Some(window) if window > 0 => expand_neighbors(&reranked, &all_chunks, window),
            _ => reranked,
        };

        Ok(truncate_to_budget(expanded, budget))
    }
}

/// Add chunks within `±window` ordinals of each selected chunk at half
/// score, preserving document order in the final output (spec.md §4.11
/// neighbor expansion).
fn expand_neighbors(selected: &[ContextSnippet], all_chunks: &[crate::domain::models::Chunk], window: u32) -> Vec<ContextSnippet> {
    let mut seen: std::collections::HashSet<crate::identifiers::ChunkId> =
        selected.iter().filter_map(|s| s.chunk_id).collect();
    let mut expanded = selected.to_vec();

    for snippet in selected {
        let (Some(chunk_id), Some(ordinal)) = (snippet.chunk_id, snippet.ordinal) else {
            continue;
        };
        let Some(anchor_chunk) = all_chunks.iter().find(|c| c.chunk_id == chunk_id) else {
            continue;
        };
        let neighbors = all_chunks.iter().filter(|c| {
            c.file_id == anchor_chunk.file_id
                && c.ordinal != ordinal
                && c.ordinal.abs_diff(ordinal) <= window
                && !seen.contains(&c.chunk_id)
        });
        for neighbor in neighbors {
            seen.insert(neighbor.chunk_id);
            expanded.push(ContextSnippet {
                source: SnippetSource::NeighborExpansion,
                relative_path: snippet.relative_path.clone(),
                chunk_id: Some(neighbor.chunk_id),
                ordinal: Some(neighbor.ordinal),
                content: neighbor.content.clone(),
                score: snippet.score * 0.5,
                token_estimate: neighbor.token_estimate.unwrap_or_else(|| crate::domain::models::chunk::estimate_tokens(&neighbor.content)),
                metadata: snippet.metadata.clone(),
            });
        }
    }

    expanded.sort_by(|a, b| {
        a.relative_path
            .cmp(&b.relative_path)
            .then(a.ordinal.unwrap_or(0).cmp(&b.ordinal.unwrap_or(0)))
    });
    expanded
}
