//! Named sequence allocator backing the fresh IDs `replaceFileArtifacts`
//! hands out on every insert (spec.md §4.10 step 4, §6).
//!
//! This crate's domain IDs (`identifiers::Id<K>`) are already globally
//! unique and time-sortable on their own, so nothing in the write path
//! actually needs a sequence value to avoid collisions. The allocator
//! exists because spec.md §6 names `file_state_seq, chunks_seq,
//! embeddings_seq, links_seq` as part of the persisted state layout; it is
//! exposed for callers (and tests) that want a monotonic per-table counter
//! alongside the ID, e.g. for stable insert ordering diagnostics.

use sqlx::{Executor, Sqlite, SqlitePool};

use crate::domain::errors::OrchestratorResult;

#[derive(Clone)]
pub struct SequenceAllocator {
    pool: SqlitePool,
}

impl SequenceAllocator {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Atomically increment and return the named sequence's new value.
    pub async fn next(&self, name: &str) -> OrchestratorResult<i64> {
        let mut tx = self.pool.begin().await?;
        let value = Self::next_with(&mut *tx, name).await?;
        tx.commit().await?;
        Ok(value)
    }

    /// Same as [`Self::next`] but runs against an already-open executor, so
    /// it can participate in the caller's transaction (used by
    /// `replace_file_artifacts`).
    pub async fn next_with<'e, E>(executor: E, name: &str) -> OrchestratorResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row: (i64,) = sqlx::query_as("UPDATE sequences SET value = value + 1 WHERE name = ? RETURNING value")
            .bind(name)
            .fetch_one(executor)
            .await?;
        Ok(row.0)
    }
}
