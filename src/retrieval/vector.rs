//! Vector search provider (spec.md §4.11).

use std::collections::HashMap;

use crate::domain::errors::OrchestratorResult;
use crate::domain::models::{Embedding, FileState};
use crate::domain::ports::{ContextRepository, Embedder};
use crate::identifiers::{ChunkId, FileId};

use super::{ContextScope, ContextSnippet, SnippetSource};

/// Build a lookup of chunk id to its (possibly non-unit) stored vector,
/// used by MMR's cosine-similarity term.
#[must_use]
pub fn vectors_by_chunk(embeddings: &[Embedding]) -> HashMap<ChunkId, Vec<f32>> {
    embeddings.iter().map(|e| (e.chunk_id, e.vector.clone())).collect()
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum()
}

/// Embed `query_text`, fetch all embeddings for the embedder's model, and
/// score by dot product against the L2-normalized query. NaN scores and
/// zero vectors are skipped; scope filters (language, kind, path) are
/// applied before scoring (spec.md §4.11).
pub async fn search<R, E>(
    repository: &R,
    embedder: &E,
    query_text: &str,
    scope: &ContextScope,
    path_by_file: &HashMap<FileId, &FileState>,
    top_k: usize,
) -> OrchestratorResult<Vec<ContextSnippet>>
where
    R: ContextRepository,
    E: Embedder,
{
    let mut query_vector = embedder.embed(query_text).await?;
    crate::domain::models::embedding::normalize_in_place(&mut query_vector);
    if query_vector.iter().all(|v| *v == 0.0) {
        return Ok(Vec::new());
    }

    let embeddings = repository.embeddings_by_model(embedder.model_name()).await?;
    let mut scored: Vec<(f64, Embedding)> = Vec::new();

    for embedding in embeddings {
        if embedding.dimensions as usize != query_vector.len() {
            continue;
        }
        let mut candidate = embedding.vector.clone();
        if !embedding.is_unit_norm() {
            crate::domain::models::embedding::normalize_in_place(&mut candidate);
        }
        let score = dot(&query_vector, &candidate);
        if score.is_nan() || candidate.iter().all(|v| *v == 0.0) {
            continue;
        }
        scored.push((score, embedding));
    }

    let mut snippets = Vec::new();
    for (score, embedding) in scored {
        let Some(chunk) = repository.chunk_by_id(embedding.chunk_id).await? else {
            continue;
        };
        let Some(file_state) = path_by_file.get(&chunk.file_id) else {
            continue;
        };
        if !scope.admits(file_state.language.as_deref(), chunk.kind, &file_state.relative_path) {
            continue;
        }
        let mut metadata = HashMap::new();
        if let Some(language) = &file_state.language {
            metadata.insert("language".to_string(), language.clone());
        }
        metadata.insert("model".to_string(), embedding.model.clone());
        snippets.push(ContextSnippet {
            source: SnippetSource::Vector,
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
    Ok(snippets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockEmbedder;
    use crate::storage::sqlite::{create_test_pool, run_migrations, SqliteContextRepository};

    #[tokio::test]
    async fn vector_search_returns_top_k_by_descending_score() {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let repo = SqliteContextRepository::new(pool);
        let embedder = MockEmbedder::new(8);

        let file_state = FileState::new("a.md", "h1", 10, 0);
        let chunk_a = crate::domain::models::Chunk::new(file_state.file_id, 0, crate::domain::models::ChunkKind::Markdown, "alpha content");
        let chunk_b = crate::domain::models::Chunk::new(file_state.file_id, 1, crate::domain::models::ChunkKind::Markdown, "beta content");
        let embedding_a = Embedding::new(chunk_a.chunk_id, embedder.model_name(), embedder.embed("alpha content").await.unwrap()).unwrap();
        let embedding_b = Embedding::new(chunk_b.chunk_id, embedder.model_name(), embedder.embed("beta content").await.unwrap()).unwrap();
        repo.replace_file_artifacts(file_state, vec![chunk_a, chunk_b], vec![embedding_a, embedding_b], vec![], vec![])
            .await
            .unwrap();

        let all_file_states = repo.all_file_states().await.unwrap();
        let path_by_file: HashMap<_, _> = all_file_states.iter().map(|f| (f.file_id, f)).collect();

        let hits = search(&repo, &embedder, "alpha content", &ContextScope::default(), &path_by_file, 1)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].content.contains("alpha"));
    }
}
