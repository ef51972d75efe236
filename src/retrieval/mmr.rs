//! Maximal Marginal Relevance re-ranking (spec.md §4.11, T6).

use std::collections::HashMap;

use crate::identifiers::ChunkId;

use super::ContextSnippet;

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|v| f64::from(*v) * f64::from(*v)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|v| f64::from(*v) * f64::from(*v)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Iteratively select the next candidate maximizing
/// `λ · rel(i) − (1−λ) · max_{j∈S} sim(i, j)`, where `rel` is the
/// candidate's incoming score and `sim` is cosine similarity over
/// `vectors_by_chunk`. Candidates with no stored vector have similarity 0
/// to everything (never penalized for diversity). `λ=1` preserves
/// relevance order; `λ=0` maximizes diversity.
#[must_use]
pub fn mmr_rerank(candidates: &[ContextSnippet], vectors_by_chunk: &HashMap<ChunkId, Vec<f32>>, lambda: f64, top_k: usize) -> Vec<ContextSnippet> {
    let lambda = lambda.clamp(0.0, 1.0);
    let mut remaining: Vec<&ContextSnippet> = candidates.iter().collect();
    let mut selected: Vec<ContextSnippet> = Vec::new();

    while !remaining.is_empty() && selected.len() < top_k {
        let mut best_index = 0;
        let mut best_mmr_score = f64::NEG_INFINITY;
        let mut best_relevance = f64::NEG_INFINITY;

        for (index, candidate) in remaining.iter().enumerate() {
            let max_similarity = selected
                .iter()
                .map(|chosen| match (
                    candidate.chunk_id.and_then(|id| vectors_by_chunk.get(&id)),
                    chosen.chunk_id.and_then(|id| vectors_by_chunk.get(&id)),
                ) {
                    (Some(a), Some(b)) => cosine_similarity(a, b),
                    _ => 0.0,
                })
                .fold(0.0_f64, f64::max);
            let mmr_score = lambda * candidate.score - (1.0 - lambda) * max_similarity;

            // Ties (e.g. every candidate's similarity term is 0 before any
            // pick has been made) break by higher underlying relevance, so
            // the first selection is always the most relevant candidate
            // regardless of lambda.
            if mmr_score > best_mmr_score || (mmr_score == best_mmr_score && candidate.score > best_relevance) {
                best_index = index;
                best_mmr_score = mmr_score;
                best_relevance = candidate.score;
            }
        }

        let chosen = remaining.remove(best_index);
        selected.push(chosen.clone());
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn lambda_one_preserves_relevance_order() {
        let a = ChunkId::new();
        let b = ChunkId::new();
        let candidates = vec![snippet(a, 0.9), snippet(b, 0.5)];
        let vectors = StdHashMap::new();
        let reranked = mmr_rerank(&candidates, &vectors, 1.0, 2);
        assert_eq!(reranked[0].chunk_id, Some(a));
        assert_eq!(reranked[1].chunk_id, Some(b));
    }

    #[test]
    fn lambda_zero_prefers_dissimilar_second_pick() {
        let a = ChunkId::new();
        let b = ChunkId::new();
        let c = ChunkId::new();
        let candidates = vec![snippet(a, 0.9), snippet(b, 0.85), snippet(c, 0.8)];
        let mut vectors = StdHashMap::new();
        vectors.insert(a, vec![1.0, 0.0]);
        vectors.insert(b, vec![1.0, 0.0]); // identical to a: maximally similar
        vectors.insert(c, vec![0.0, 1.0]); // orthogonal to a: maximally dissimilar
        let reranked = mmr_rerank(&candidates, &vectors, 0.0, 3);
        assert_eq!(reranked[0].chunk_id, Some(a));
        assert_eq!(reranked[1].chunk_id, Some(c));
    }
}
