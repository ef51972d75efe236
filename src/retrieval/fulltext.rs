//! Full-text search provider: term-frequency × IDF scoring with length
//! boosts/penalties (spec.md §4.11).

use std::collections::{HashMap, HashSet};

use crate::domain::models::{Chunk, FileState};
use crate::identifiers::FileId;

use super::{ContextScope, ContextSnippet, SnippetSource};

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn term_boost(term: &str) -> f64 {
    if term.len() >= 8 {
        1.15
    } else if term.len() < 4 {
        0.95
    } else {
        1.0
    }
}

/// Tokenize `query_text`, compute lazy per-term document frequency over
/// `chunks`, and score by TF × IDF (toggleable) with per-term length
/// boosts/penalties.
#[must_use]
pub fn search(
    chunks: &[Chunk],
    path_by_file: &HashMap<FileId, &FileState>,
    query_text: &str,
    scope: &ContextScope,
    top_k: usize,
    use_idf: bool,
) -> Vec<ContextSnippet> {
    let query_terms = tokenize(query_text);
    if query_terms.is_empty() {
        return Vec::new();
    }
    let unique_terms: HashSet<&str> = query_terms.iter().map(String::as_str).collect();

    let eligible: Vec<&Chunk> = chunks
        .iter()
        .filter(|chunk| {
            path_by_file
                .get(&chunk.file_id)
                .is_some_and(|file_state| scope.admits(file_state.language.as_deref(), chunk.kind, &file_state.relative_path))
        })
        .collect();

    let total_docs = eligible.len().max(1) as f64;
    let mut document_frequency: HashMap<&str, usize> = HashMap::new();
    for &term in &unique_terms {
        document_frequency.insert(
            term,
            eligible.iter().filter(|chunk| tokenize(&chunk.content).iter().any(|t| t == term)).count(),
        );
    }

    let mut snippets = Vec::new();
    for chunk in eligible {
        let doc_terms = tokenize(&chunk.content);
        if doc_terms.is_empty() {
            continue;
        }
        let doc_len = doc_terms.len() as f64;
        let mut score = 0.0;
        for &term in &unique_terms {
            let term_frequency = doc_terms.iter().filter(|t| t.as_str() == term).count() as f64 / doc_len;
            if term_frequency == 0.0 {
                continue;
            }
            let idf = if use_idf {
                let df = *document_frequency.get(term).unwrap_or(&0) as f64;
                ((total_docs + 1.0) / (df + 1.0)).ln() + 1.0
            } else {
                1.0
            };
            score += term_frequency * idf * term_boost(term);
        }
        if score <= 0.0 {
            continue;
        }
        let Some(file_state) = path_by_file.get(&chunk.file_id) else {
            continue;
        };
        let mut metadata = HashMap::new();
        if let Some(language) = &file_state.language {
            metadata.insert("language".to_string(), language.clone());
        }
        snippets.push(ContextSnippet {
            source: SnippetSource::FullText,
            relative_path: file_state.relative_path.clone(),
            chunk_id: Some(chunk.chunk_id),
            ordinal: Some(chunk.ordinal),
            content: chunk.content.clone(),
            score,
            token_estimate: chunk.token_estimate.unwrap_or_else(|| crate::domain::models::chunk::estimate_tokens(&chunk.content)),
            metadata,
        });
    }

    snippets.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    snippets.truncate(top_k);
    snippets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ChunkKind;

    #[test]
    fn ranks_chunk_with_more_term_matches_higher() {
        let file_state = FileState::new("a.md", "h1", 10, 0);
        let chunk_a = Chunk::new(file_state.file_id, 0, ChunkKind::Markdown, "retrieval engine retrieval engine fusion");
        let chunk_b = Chunk::new(file_state.file_id, 1, ChunkKind::Markdown, "unrelated content about nothing");
        let path_by_file: HashMap<_, _> = [(file_state.file_id, &file_state)].into_iter().collect();

        let hits = search(&[chunk_a, chunk_b], &path_by_file, "retrieval engine", &ContextScope::default(), 10, true);
        assert!(!hits.is_empty());
        assert!(hits[0].content.contains("retrieval engine retrieval"));
    }

    #[test]
    fn empty_query_yields_no_hits() {
        let file_state = FileState::new("a.md", "h1", 10, 0);
        let chunk = Chunk::new(file_state.file_id, 0, ChunkKind::Markdown, "content");
        let path_by_file: HashMap<_, _> = [(file_state.file_id, &file_state)].into_iter().collect();
        assert!(search(&[chunk], &path_by_file, "   ", &ContextScope::default(), 10, true).is_empty());
    }
}
