//! Context indexing engine: discovery, change detection, chunking,
//! embedding, symbol extraction, and transactional artifact replacement
//! with rollback (spec.md §4.10).
//!
//! Grounded in the teacher's `infrastructure::vector` subsystem
//! (`chunker.rs`, `vector_store.rs`, `model_cache.rs`) for the
//! embed-then-store pipeline shape; the embedder itself is an external
//! collaborator modeled as `domain::ports::Embedder`, matching the
//! teacher's `adapters::substrates::mock` pattern of shipping a mock
//! alongside the unshipped real binding.

pub mod chunking;
pub mod discovery;
pub mod hashing;
pub mod symbols;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::domain::errors::OrchestratorResult;
use crate::domain::models::{ChangeKind, Chunk, ChunkKind, FileState, Link};
use crate::domain::ports::{ContextRepository, Embedder};
use crate::events::{EventBus, EventKind};

pub use chunking::{chunk_content, DEFAULT_MAX_TOKENS};
pub use discovery::{discover, PathValidator};
pub use hashing::{hash_bytes, hash_file};
pub use symbols::extract_symbols;

/// Bound on how many chunks are embedded in one embedder call (spec.md
/// §4.10 `maxBatchSize`).
pub const DEFAULT_MAX_EMBED_BATCH: usize = 32;

/// Outcome of one file's indexing attempt, folded into a [`BatchResult`].
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Indexed { relative_path: String, chunk_count: usize },
    Unchanged { relative_path: String },
    Deleted { relative_path: String },
    Failed { relative_path: String, reason: String },
}

/// Aggregate result of running a batch over a discovered file set.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub total: u64,
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub outcomes: Vec<FileOutcome>,
}

/// Guess a chunk-splitting strategy and a symbol-extraction language from
/// a file extension. Unrecognized extensions fall back to plain text with
/// no symbol extraction.
#[must_use]
pub fn classify_path(path: &Path) -> (ChunkKind, Option<&'static str>) {
    match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
        Some("md" | "markdown") => (ChunkKind::Markdown, None),
        Some("rs") => (ChunkKind::Code, Some("rust")),
        Some("py") => (ChunkKind::Code, Some("python")),
        Some("js" | "mjs" | "cjs") => (ChunkKind::Code, Some("javascript")),
        Some("ts" | "tsx") => (ChunkKind::Code, Some("typescript")),
        Some("jsx") => (ChunkKind::Code, Some("javascript")),
        Some("go" | "java" | "c" | "h" | "cpp" | "hpp" | "cs") => (ChunkKind::Code, None),
        _ => (ChunkKind::PlainText, None),
    }
}

/// Determine the [`ChangeKind`] for a discovered path against the last
/// stored state by content hash (spec.md §4.10 change detection).
#[must_use]
pub fn classify_change(previous: Option<&FileState>, current_hash: &str, exists_on_disk: bool) -> ChangeKind {
    if !exists_on_disk {
        return ChangeKind::Deleted;
    }
    match previous {
        None => ChangeKind::New,
        Some(state) if state.content_hash == current_hash => ChangeKind::Unchanged,
        Some(_) => ChangeKind::Modified,
    }
}

/// Indexes a single file end to end: hash, chunk, embed, extract symbols,
/// and replace its artifact set transactionally.
pub struct FileIndexer<'a, R, E> {
    pub repository: &'a R,
    pub embedder: &'a E,
    pub max_tokens: u32,
    pub max_embed_batch: usize,
}

impl<'a, R, E> FileIndexer<'a, R, E>
where
    R: ContextRepository,
    E: Embedder,
{
    /// Index `absolute_path`, storing artifacts under `relative_path`.
    /// Returns the number of chunks produced. A no-op (returns `Ok(0)`
    /// with no repository writes) if the file is unchanged.
    pub async fn index_file(&self, absolute_path: &Path, relative_path: &str) -> OrchestratorResult<usize> {
        let bytes = tokio::fs::read(absolute_path)
            .await
            .map_err(|e| crate::domain::errors::OrchestratorError::FileNotFound(format!("{}: {e}", absolute_path.display())))?;
        let content_hash = hash_bytes(&bytes);
        let content = String::from_utf8_lossy(&bytes).into_owned();

        let previous = self.repository.file_state_by_path(relative_path).await?;
        let change = classify_change(previous.as_ref(), &content_hash, true);
        if change == ChangeKind::Unchanged {
            return Ok(0);
        }

        let metadata = tokio::fs::metadata(absolute_path)
            .await
            .map_err(|e| crate::domain::errors::OrchestratorError::FileNotFound(format!("{}: {e}", absolute_path.display())))?;
        let mtime_ns = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0);

        let (kind, language) = classify_path(Path::new(relative_path));
        let mut file_state = FileState::new(relative_path, content_hash, bytes.len() as u64, mtime_ns);
        file_state.language = language.map(str::to_string);
        if let Some(existing) = &previous {
            file_state.file_id = existing.file_id;
        }

        let chunks = chunk_content(file_state.file_id, kind, &content, self.max_tokens);
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();

        let mut embeddings = Vec::new();
        let mut consumed = 0usize;
        for batch in texts.chunks(self.max_embed_batch.max(1)) {
            let vectors = self.embedder.embed_batch(batch).await?;
            // Zip against the chunks this batch actually covers (by input
            // position, not by how many embeddings survived filtering) so a
            // dropped non-finite/zero-norm vector mid-batch can't desync the
            // offset for the next batch.
            for (chunk, vector) in chunks.iter().skip(consumed).zip(vectors) {
                if let Some(embedding) =
                    crate::domain::models::Embedding::new(chunk.chunk_id, self.embedder.model_name(), vector)
                {
                    embeddings.push(embedding);
                }
            }
            consumed += batch.len();
        }

        let symbols = match language {
            Some(lang) => chunks
                .iter()
                .flat_map(|chunk| extract_symbols(file_state.file_id, chunk.chunk_id, &chunk.content, lang))
                .collect(),
            None => Vec::new(),
        };

        let links: Vec<Link> = Vec::new();
        let chunk_count = chunks.len();
        self.repository
            .replace_file_artifacts(file_state, chunks, embeddings, links, symbols)
            .await?;
        Ok(chunk_count)
    }
}

/// Runs discovery + per-file indexing over up to `parallelism` concurrent
/// file tasks, collecting successes and failures without aborting on a
/// single file's error (spec.md §4.10 batch coordination).
pub struct BatchIndexer<'a, R, E> {
    pub repository: &'a R,
    pub embedder: &'a E,
    pub parallelism: usize,
    pub events: Option<Arc<EventBus>>,
}

impl<'a, R, E> BatchIndexer<'a, R, E>
where
    R: ContextRepository,
    E: Embedder,
{
    pub async fn run(&self, root: &Path, validator: &PathValidator) -> OrchestratorResult<BatchResult> {
        let paths = discover(root, validator).await?;
        let total = paths.len() as u64;
        let semaphore = Arc::new(Semaphore::new(self.parallelism.max(1)));
        let indexer = FileIndexer {
            repository: self.repository,
            embedder: self.embedder,
            max_tokens: DEFAULT_MAX_TOKENS,
            max_embed_batch: DEFAULT_MAX_EMBED_BATCH,
        };

        let mut result = BatchResult { total, ..Default::default() };

        let jobs = paths.into_iter().map(|path| {
            let semaphore = Arc::clone(&semaphore);
            let relative_path = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().into_owned();
            async {
                let _permit = semaphore.acquire().await.expect("semaphore not closed");
                let outcome = indexer.index_file(&path, &relative_path).await;
                (relative_path, outcome)
            }
        });

        let outcomes = futures::future::join_all(jobs).await;
        for (relative_path, outcome) in outcomes {
            result.processed += 1;
            match outcome {
                Ok(0) => result.outcomes.push(FileOutcome::Unchanged { relative_path }),
                Ok(chunk_count) => {
                    result.succeeded += 1;
                    result.outcomes.push(FileOutcome::Indexed { relative_path, chunk_count });
                }
                Err(err) => {
                    result.failed += 1;
                    result.outcomes.push(FileOutcome::Failed { relative_path, reason: err.to_string() });
                }
            }
            if let Some(events) = &self.events {
                events.publish(EventKind::IndexingProgress {
                    total: result.total,
                    processed: result.processed,
                    succeeded: result.succeeded,
                    failed: result.failed,
                    last_error: result.outcomes.last().and_then(|o| match o {
                        FileOutcome::Failed { reason, .. } => Some(reason.clone()),
                        _ => None,
                    }),
                });
            }
        }

        Ok(result)
    }

    /// Propagate deletions: for every stored file state no longer present
    /// in `discovered`, call `delete_file_artifacts`. Failures are
    /// recorded in the returned result rather than aborting (spec.md
    /// §4.10 deletion propagation).
    pub async fn propagate_deletions(&self, discovered: &[String]) -> OrchestratorResult<BatchResult> {
        let stored = self.repository.all_file_states().await?;
        let discovered_set: std::collections::HashSet<&str> = discovered.iter().map(String::as_str).collect();
        let missing: Vec<&FileState> = stored.iter().filter(|s| !discovered_set.contains(s.relative_path.as_str())).collect();

        let mut result = BatchResult { total: missing.len() as u64, ..Default::default() };
        for state in missing {
            result.processed += 1;
            match self.repository.delete_file_artifacts(&state.relative_path).await {
                Ok(()) => {
                    result.succeeded += 1;
                    result.outcomes.push(FileOutcome::Deleted { relative_path: state.relative_path.clone() });
                }
                Err(err) => {
                    result.failed += 1;
                    result.outcomes.push(FileOutcome::Failed {
                        relative_path: state.relative_path.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockEmbedder;
    use crate::storage::sqlite::{create_test_pool, run_migrations, SqliteContextRepository};

    async fn repository() -> SqliteContextRepository {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteContextRepository::new(pool)
    }

    #[test]
    fn classifies_markdown_and_rust_paths() {
        assert_eq!(classify_path(Path::new("README.md")).0, ChunkKind::Markdown);
        let (kind, lang) = classify_path(Path::new("src/lib.rs"));
        assert_eq!(kind, ChunkKind::Code);
        assert_eq!(lang, Some("rust"));
    }

    #[test]
    fn change_classification_covers_new_modified_unchanged_deleted() {
        assert_eq!(classify_change(None, "h1", true), ChangeKind::New);
        assert_eq!(classify_change(None, "h1", false), ChangeKind::Deleted);
        let state = FileState::new("a.rs", "h1", 10, 0);
        assert_eq!(classify_change(Some(&state), "h1", true), ChangeKind::Unchanged);
        assert_eq!(classify_change(Some(&state), "h2", true), ChangeKind::Modified);
    }

    /// Embedder that returns an all-zero (filtered-out) vector for one
    /// global text position and otherwise encodes that position (1-based)
    /// in `vector[0]`, so a misaligned `skip()` offset across batches shows
    /// up as a decoded position that doesn't match the chunk it landed on.
    struct DropOneEmbedder {
        drop_at: usize,
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl crate::domain::ports::Embedder for DropOneEmbedder {
        async fn embed(&self, _text: &str) -> OrchestratorResult<Vec<f32>> {
            unreachable!("embed_batch is overridden")
        }

        async fn embed_batch(&self, texts: &[String]) -> OrchestratorResult<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for _ in texts {
                let position = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if position == self.drop_at {
                    out.push(vec![0.0f32, 0.0]);
                } else {
                    out.push(vec![(position + 1) as f32, 1.0]);
                }
            }
            Ok(out)
        }

        fn dimension(&self) -> u32 {
            2
        }

        fn model_name(&self) -> &str {
            "drop-one-test"
        }
    }

    #[tokio::test]
    async fn file_indexer_keeps_chunk_embedding_alignment_when_a_mid_batch_vector_is_dropped() {
        let repository = repository().await;
        // Seven short lines, one chunk per line at a 1-token max so there are
        // 7 chunks; a batch size of 3 makes batches [0,1,2], [3,4,5], [6],
        // with the drop landing mid-way through the first batch.
        let embedder = DropOneEmbedder { drop_at: 1, calls: std::sync::atomic::AtomicUsize::new(0) };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        let content = (0..7).map(|i| format!("line {i}\n")).collect::<String>();
        tokio::fs::write(&path, &content).await.unwrap();

        let indexer = FileIndexer { repository: &repository, embedder: &embedder, max_tokens: 1, max_embed_batch: 3 };
        indexer.index_file(&path, "notes.md").await.unwrap();

        let artifacts = repository.fetch_file_artifacts_by_path("notes.md").await.unwrap().unwrap();
        assert_eq!(artifacts.chunks.len(), 7);
        assert_eq!(artifacts.embeddings.len(), 6, "the dropped zero-norm vector must not appear");

        for embedding in &artifacts.embeddings {
            let chunk = artifacts.chunks.iter().find(|c| c.chunk_id == embedding.chunk_id).expect("embedding must reference a real chunk");
            // `Embedding::new` unit-normalizes the vector, but the ratio
            // between the two components survives: it was stamped as
            // (global_position + 1) / 1.0 before normalization.
            let claimed_position = (embedding.vector[0] / embedding.vector[1]).round() as u32;
            assert_eq!(claimed_position, chunk.ordinal + 1, "embedding landed on the wrong chunk after a mid-batch drop");
        }
    }

    #[tokio::test]
    async fn file_indexer_produces_chunks_and_embeddings_for_new_file() {
        let repository = repository().await;
        let embedder = MockEmbedder::new(16);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        tokio::fs::write(&path, "# Title\nsome content\n").await.unwrap();

        let indexer = FileIndexer {
            repository: &repository,
            embedder: &embedder,
            max_tokens: DEFAULT_MAX_TOKENS,
            max_embed_batch: DEFAULT_MAX_EMBED_BATCH,
        };
        let chunk_count = indexer.index_file(&path, "notes.md").await.unwrap();
        assert!(chunk_count > 0);

        let state = repository.file_state_by_path("notes.md").await.unwrap();
        assert!(state.is_some());
    }

    #[tokio::test]
    async fn file_indexer_is_a_no_op_for_unchanged_file() {
        let repository = repository().await;
        let embedder = MockEmbedder::new(16);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        tokio::fs::write(&path, "# Title\nsome content\n").await.unwrap();

        let indexer = FileIndexer {
            repository: &repository,
            embedder: &embedder,
            max_tokens: DEFAULT_MAX_TOKENS,
            max_embed_batch: DEFAULT_MAX_EMBED_BATCH,
        };
        indexer.index_file(&path, "notes.md").await.unwrap();
        let second_run = indexer.index_file(&path, "notes.md").await.unwrap();
        assert_eq!(second_run, 0);
    }

    #[tokio::test]
    async fn batch_indexer_propagates_deletions_for_missing_files() {
        let repository = repository().await;
        let embedder = MockEmbedder::new(16);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doomed.md");
        tokio::fs::write(&path, "# Doomed\ncontent\n").await.unwrap();

        let indexer = FileIndexer {
            repository: &repository,
            embedder: &embedder,
            max_tokens: DEFAULT_MAX_TOKENS,
            max_embed_batch: DEFAULT_MAX_EMBED_BATCH,
        };
        indexer.index_file(&path, "doomed.md").await.unwrap();

        let batch = BatchIndexer { repository: &repository, embedder: &embedder, parallelism: 2, events: None };
        let result = batch.propagate_deletions(&[]).await.unwrap();
        assert_eq!(result.succeeded, 1);
        assert!(repository.file_state_by_path("doomed.md").await.unwrap().is_none());
    }
}
