//! Hybrid fusion: reciprocal-rank fusion across enabled providers with
//! per-provider weights (spec.md §4.11).

use std::collections::HashMap;

use super::ContextSnippet;

/// A provider's result list paired with its fusion weight.
pub type ProviderWeight = f64;

/// Constant `k` in `1 / (k + rank)`, the standard RRF smoothing term.
const RRF_K: f64 = 60.0;

fn snippet_key(snippet: &ContextSnippet) -> String {
    match snippet.chunk_id {
        Some(chunk_id) => chunk_id.to_string(),
        None => format!("{}:{}", snippet.relative_path, snippet.content),
    }
}

/// Fuse multiple ranked, weighted provider result lists into one list,
/// summing `weight / (k + rank)` per snippet across lists it appears in.
/// Ties break by higher individual (pre-fusion) score.
#[must_use]
pub fn reciprocal_rank_fusion(ranked_lists: &[(Vec<ContextSnippet>, ProviderWeight)]) -> Vec<ContextSnippet> {
    let mut fused_scores: HashMap<String, f64> = HashMap::new();
    let mut best_individual_score: HashMap<String, f64> = HashMap::new();
    let mut representative: HashMap<String, ContextSnippet> = HashMap::new();

    for (list, weight) in ranked_lists {
        for (rank, snippet) in list.iter().enumerate() {
            let key = snippet_key(snippet);
            let contribution = weight / (RRF_K + (rank + 1) as f64);
            *fused_scores.entry(key.clone()).or_insert(0.0) += contribution;
            let best = best_individual_score.entry(key.clone()).or_insert(0.0);
            if snippet.score > *best {
                *best = snippet.score;
            }
            representative.entry(key).or_insert_with(|| snippet.clone());
        }
    }

    let mut fused: Vec<ContextSnippet> = representative
        .into_iter()
        .map(|(key, mut snippet)| {
            snippet.score = fused_scores.get(&key).copied().unwrap_or(0.0);
            (snippet, best_individual_score.get(&key).copied().unwrap_or(0.0))
        })
        .map(|(snippet, _)| snippet)
        .collect();

    fused.sort_by(|a, b| {
        let fused_cmp = b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal);
        if fused_cmp != std::cmp::Ordering::Equal {
            return fused_cmp;
        }
        let a_best = best_individual_score.get(&snippet_key(a)).copied().unwrap_or(0.0);
        let b_best = best_individual_score.get(&snippet_key(b)).copied().unwrap_or(0.0);
        b_best.partial_cmp(&a_best).unwrap_or(std::cmp::Ordering::Equal)
    });

    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::ChunkId;
    use std::collections::HashMap as StdHashMap;

    fn snippet(chunk_id: ChunkId, score: f64) -> ContextSnippet {
        ContextSnippet {
            source: super::super::SnippetSource::Vector,
            relative_path: "a.rs".to_string(),
            chunk_id: Some(chunk_id),
            ordinal: Some(0),
            content: "x".to_string(),
            score,
            token_estimate: 1,
            metadata: StdHashMap::new(),
        }
    }

    #[test]
    fn item_ranked_highly_by_multiple_providers_wins_fusion() {
        let shared = ChunkId::new();
        let other_a = ChunkId::new();
        let other_b = ChunkId::new();
        let list_a = vec![snippet(shared, 0.9), snippet(other_a, 0.5)];
        let list_b = vec![snippet(shared, 0.8), snippet(other_b, 0.6)];
        let fused = reciprocal_rank_fusion(&[(list_a, 1.0), (list_b, 1.0)]);
        assert_eq!(fused[0].chunk_id, Some(shared));
    }

    #[test]
    fn empty_lists_fuse_to_empty() {
        assert!(reciprocal_rank_fusion(&[]).is_empty());
    }
}
