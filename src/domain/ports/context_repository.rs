//! Context repository port: the transactional storage surface the indexing
//! and retrieval engines consume (spec.md §4.10, §4.11).

use async_trait::async_trait;

use crate::domain::errors::OrchestratorResult;
use crate::domain::models::{Chunk, Embedding, FileState, Link, Symbol};
use crate::identifiers::{ChunkId, FileId};

/// The full set of persisted artifacts owned by one `FileState`, used both
/// as the pre-call snapshot for rollback (spec.md §4.10 step 5, T5) and as
/// the return shape of a full-artifact fetch.
#[derive(Debug, Clone)]
pub struct FileArtifacts {
    pub file_state: FileState,
    pub chunks: Vec<Chunk>,
    pub embeddings: Vec<Embedding>,
    pub links: Vec<Link>,
    pub symbols: Vec<Symbol>,
}

/// Repository interface over `file_state, chunks, embeddings, links,
/// symbols` (spec.md §6 persisted state layout). All mutation of a file's
/// artifact set goes through `replace_file_artifacts`, which owns the
/// transactional delete-then-insert and the rollback-on-failure contract.
#[async_trait]
pub trait ContextRepository: Send + Sync {
    async fn file_state_by_path(&self, relative_path: &str) -> OrchestratorResult<Option<FileState>>;

    async fn file_state_by_id(&self, file_id: FileId) -> OrchestratorResult<Option<FileState>>;

    async fn all_file_states(&self) -> OrchestratorResult<Vec<FileState>>;

    /// Snapshot of everything owned by the file at `relative_path`, or
    /// `None` if the file has no stored state. Used both for retrieval and
    /// as the rollback source of truth (T5).
    async fn fetch_file_artifacts_by_path(&self, relative_path: &str) -> OrchestratorResult<Option<FileArtifacts>>;

    /// Replace a file's entire artifact set inside one transaction:
    /// delete embeddings, links (source and target), symbols, then chunks
    /// for the file's current chunk set; insert the new chunks, embeddings,
    /// and links with freshly allocated IDs; commit. On any failure after
    /// the pre-read snapshot, re-insert the snapshot in a fresh transaction
    /// before propagating the original error (spec.md §4.10, §7
    /// `RollbackFailure`).
    async fn replace_file_artifacts(
        &self,
        new_file_state: FileState,
        new_chunks: Vec<Chunk>,
        new_embeddings: Vec<Embedding>,
        new_links: Vec<Link>,
        new_symbols: Vec<Symbol>,
    ) -> OrchestratorResult<()>;

    /// Delete propagation for a file no longer present on disk: removes all
    /// dependents of the file's chunks, then the file itself. Failures are
    /// recorded by the caller (`BatchIndexer`) rather than aborting a batch
    /// (spec.md §4.10 deletion propagation).
    async fn delete_file_artifacts(&self, relative_path: &str) -> OrchestratorResult<()>;

    async fn embeddings_by_model(&self, model: &str) -> OrchestratorResult<Vec<Embedding>>;

    async fn chunk_by_id(&self, chunk_id: ChunkId) -> OrchestratorResult<Option<Chunk>>;

    async fn chunks_by_file(&self, file_id: FileId) -> OrchestratorResult<Vec<Chunk>>;

    async fn all_chunks(&self) -> OrchestratorResult<Vec<Chunk>>;

    async fn symbols_by_file(&self, file_id: FileId) -> OrchestratorResult<Vec<Symbol>>;

    async fn all_symbols(&self) -> OrchestratorResult<Vec<Symbol>>;
}
