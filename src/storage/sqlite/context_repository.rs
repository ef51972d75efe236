//! sqlite `ContextRepository` implementation: transactional per-file
//! artifact replacement with crash-safe rollback (spec.md §4.10).
//!
//! Grounded on the teacher's `infrastructure/vector/vector_store.rs`
//! (schema shape for chunks/embeddings) generalized to the full
//! file_state/chunks/embeddings/links/symbols ownership tree, and on
//! `adapters/sqlite/task_repository.rs` for the row-mapping style.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::models::{Chunk, ChunkKind, Embedding, FileState, Link, LinkType, Symbol, SymbolType};
use crate::domain::ports::context_repository::{ContextRepository, FileArtifacts};
use crate::identifiers::{ChunkId, EmbeddingId, FileId, LinkId, SymbolId};

use super::sequences::SequenceAllocator;

#[derive(Clone)]
pub struct SqliteContextRepository {
    pool: SqlitePool,
}

impl SqliteContextRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn chunks_for_file(&self, file_id: FileId) -> OrchestratorResult<Vec<Chunk>> {
        let rows = sqlx::query("SELECT * FROM chunks WHERE file_id = ? ORDER BY ordinal ASC")
            .bind(file_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_chunk).collect()
    }

    async fn embeddings_for_chunks(&self, chunk_ids: &[ChunkId]) -> OrchestratorResult<Vec<Embedding>> {
        if chunk_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = chunk_ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!("SELECT * FROM embeddings WHERE chunk_id IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for id in chunk_ids {
            query = query.bind(id.to_string());
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_embedding).collect()
    }

    async fn links_for_file(&self, file_id: FileId, chunk_ids: &[ChunkId]) -> OrchestratorResult<Vec<Link>> {
        let mut links = Vec::new();
        if !chunk_ids.is_empty() {
            let placeholders = chunk_ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
            let sql = format!("SELECT * FROM links WHERE source_chunk_id IN ({placeholders})");
            let mut query = sqlx::query(&sql);
            for id in chunk_ids {
                query = query.bind(id.to_string());
            }
            for row in query.fetch_all(&self.pool).await? {
                links.push(row_to_link(&row)?);
            }
        }
        let target_rows = sqlx::query("SELECT * FROM links WHERE target_file_id = ?")
            .bind(file_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        for row in &target_rows {
            let link = row_to_link(row)?;
            if !links.iter().any(|l| l.link_id == link.link_id) {
                links.push(link);
            }
        }
        Ok(links)
    }

    async fn symbols_for_file_inner(&self, file_id: FileId) -> OrchestratorResult<Vec<Symbol>> {
        let rows = sqlx::query("SELECT * FROM symbols WHERE file_id = ?")
            .bind(file_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_symbol).collect()
    }

    /// Re-insert a full snapshot inside a fresh transaction, used both by
    /// the rollback path and (degenerately, with an empty snapshot) by
    /// nothing else — kept as one code path so rollback and first-write
    /// cannot drift apart.
    async fn write_artifacts(
        tx: &mut Transaction<'_, Sqlite>,
        artifacts: &FileArtifacts,
    ) -> OrchestratorResult<()> {
        upsert_file_state(tx, &artifacts.file_state).await?;
        for chunk in &artifacts.chunks {
            insert_chunk(tx, chunk).await?;
        }
        for embedding in &artifacts.embeddings {
            insert_embedding(tx, embedding).await?;
        }
        for link in &artifacts.links {
            insert_link(tx, link).await?;
        }
        for symbol in &artifacts.symbols {
            insert_symbol(tx, symbol).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ContextRepository for SqliteContextRepository {
    async fn file_state_by_path(&self, relative_path: &str) -> OrchestratorResult<Option<FileState>> {
        let row = sqlx::query("SELECT * FROM file_state WHERE relative_path = ?")
            .bind(relative_path)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_file_state).transpose()
    }

    async fn file_state_by_id(&self, file_id: FileId) -> OrchestratorResult<Option<FileState>> {
        let row = sqlx::query("SELECT * FROM file_state WHERE file_id = ?")
            .bind(file_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_file_state).transpose()
    }

    async fn all_file_states(&self) -> OrchestratorResult<Vec<FileState>> {
        let rows = sqlx::query("SELECT * FROM file_state").fetch_all(&self.pool).await?;
        rows.iter().map(row_to_file_state).collect()
    }

    async fn fetch_file_artifacts_by_path(&self, relative_path: &str) -> OrchestratorResult<Option<FileArtifacts>> {
        let Some(file_state) = self.file_state_by_path(relative_path).await? else {
            return Ok(None);
        };
        let chunks = self.chunks_for_file(file_state.file_id).await?;
        let chunk_ids: Vec<ChunkId> = chunks.iter().map(|c| c.chunk_id).collect();
        let embeddings = self.embeddings_for_chunks(&chunk_ids).await?;
        let links = self.links_for_file(file_state.file_id, &chunk_ids).await?;
        let symbols = self.symbols_for_file_inner(file_state.file_id).await?;
        Ok(Some(FileArtifacts {
            file_state,
            chunks,
            embeddings,
            links,
            symbols,
        }))
    }

    async fn replace_file_artifacts(
        &self,
        new_file_state: FileState,
        new_chunks: Vec<Chunk>,
        new_embeddings: Vec<Embedding>,
        new_links: Vec<Link>,
        new_symbols: Vec<Symbol>,
    ) -> OrchestratorResult<()> {
        let relative_path = new_file_state.relative_path.clone();
        let snapshot = self.fetch_file_artifacts_by_path(&relative_path).await?;

        let attempt = self
            .try_replace(&new_file_state, &new_chunks, &new_embeddings, &new_links, &new_symbols)
            .await;

        match attempt {
            Ok(()) => Ok(()),
            Err(original_err) => {
                if let Some(snapshot) = snapshot {
                    if let Err(restore_err) = self.restore_snapshot(&snapshot).await {
                        tracing::error!(
                            path = %relative_path,
                            restore_error = %restore_err,
                            original_error = %original_err,
                            "rollback restore failed after replace_file_artifacts error"
                        );
                    }
                }
                Err(original_err)
            }
        }
    }

    async fn delete_file_artifacts(&self, relative_path: &str) -> OrchestratorResult<()> {
        let Some(file_state) = self.file_state_by_path(relative_path).await? else {
            return Ok(());
        };
        let mut tx = self.pool.begin().await?;
        delete_dependents(&mut tx, file_state.file_id).await?;
        sqlx::query("DELETE FROM file_state WHERE file_id = ?")
            .bind(file_state.file_id.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn embeddings_by_model(&self, model: &str) -> OrchestratorResult<Vec<Embedding>> {
        let rows = sqlx::query("SELECT * FROM embeddings WHERE model = ?")
            .bind(model)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_embedding).collect()
    }

    async fn chunk_by_id(&self, chunk_id: ChunkId) -> OrchestratorResult<Option<Chunk>> {
        let row = sqlx::query("SELECT * FROM chunks WHERE chunk_id = ?")
            .bind(chunk_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_chunk).transpose()
    }

    async fn chunks_by_file(&self, file_id: FileId) -> OrchestratorResult<Vec<Chunk>> {
        self.chunks_for_file(file_id).await
    }

    async fn all_chunks(&self) -> OrchestratorResult<Vec<Chunk>> {
        let rows = sqlx::query("SELECT * FROM chunks").fetch_all(&self.pool).await?;
        rows.iter().map(row_to_chunk).collect()
    }

    async fn symbols_by_file(&self, file_id: FileId) -> OrchestratorResult<Vec<Symbol>> {
        self.symbols_for_file_inner(file_id).await
    }

    async fn all_symbols(&self) -> OrchestratorResult<Vec<Symbol>> {
        let rows = sqlx::query("SELECT * FROM symbols").fetch_all(&self.pool).await?;
        rows.iter().map(row_to_symbol).collect()
    }
}

impl SqliteContextRepository {
    async fn try_replace(
        &self,
        new_file_state: &FileState,
        new_chunks: &[Chunk],
        new_embeddings: &[Embedding],
        new_links: &[Link],
        new_symbols: &[Symbol],
    ) -> OrchestratorResult<()> {
        let mut tx = self.pool.begin().await?;

        if let Some(existing) = self.file_state_by_path(&new_file_state.relative_path).await? {
            delete_dependents(&mut tx, existing.file_id).await?;
        }

        upsert_file_state(&mut tx, new_file_state).await?;
        for chunk in new_chunks {
            let _ = SequenceAllocator::next_with(&mut *tx, "chunks_seq").await?;
            insert_chunk(&mut tx, chunk).await?;
        }
        for embedding in new_embeddings {
            let _ = SequenceAllocator::next_with(&mut *tx, "embeddings_seq").await?;
            insert_embedding(&mut tx, embedding).await?;
        }
        for link in new_links {
            let _ = SequenceAllocator::next_with(&mut *tx, "links_seq").await?;
            insert_link(&mut tx, link).await?;
        }
        for symbol in new_symbols {
            insert_symbol(&mut tx, symbol).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn restore_snapshot(&self, snapshot: &FileArtifacts) -> OrchestratorResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| rollback_failure(&snapshot.file_state.relative_path, &e))?;

        delete_dependents(&mut tx, snapshot.file_state.file_id)
            .await
            .map_err(|e| rollback_failure(&snapshot.file_state.relative_path, &e))?;
        sqlx::query("DELETE FROM file_state WHERE file_id = ?")
            .bind(snapshot.file_state.file_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| rollback_failure(&snapshot.file_state.relative_path, &e))?;

        Self::write_artifacts(&mut tx, snapshot)
            .await
            .map_err(|e| rollback_failure(&snapshot.file_state.relative_path, &e))?;

        tx.commit().await.map_err(|e| rollback_failure(&snapshot.file_state.relative_path, &e))?;
        Ok(())
    }
}

fn rollback_failure(path: &str, source: &impl std::fmt::Display) -> OrchestratorError {
    OrchestratorError::RollbackFailure {
        path: path.to_string(),
        reason: source.to_string(),
    }
}

async fn delete_dependents(tx: &mut Transaction<'_, Sqlite>, file_id: FileId) -> OrchestratorResult<()> {
    sqlx::query(
        "DELETE FROM embeddings WHERE chunk_id IN (SELECT chunk_id FROM chunks WHERE file_id = ?)",
    )
    .bind(file_id.to_string())
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        "DELETE FROM links WHERE source_chunk_id IN (SELECT chunk_id FROM chunks WHERE file_id = ?) OR target_file_id = ?",
    )
    .bind(file_id.to_string())
    .bind(file_id.to_string())
    .execute(&mut **tx)
    .await?;

    // usage_metrics is a best-effort delete for a collaborator table this
    // core does not define (spec.md §9 Open Question #2); no-op here.

    sqlx::query("DELETE FROM symbols WHERE file_id = ?")
        .bind(file_id.to_string())
        .execute(&mut **tx)
        .await?;

    sqlx::query("DELETE FROM chunks WHERE file_id = ?")
        .bind(file_id.to_string())
        .execute(&mut **tx)
        .await?;

    Ok(())
}

async fn upsert_file_state(tx: &mut Transaction<'_, Sqlite>, file_state: &FileState) -> OrchestratorResult<()> {
    let _ = SequenceAllocator::next_with(&mut **tx, "file_state_seq").await?;
    sqlx::query(
        r#"INSERT INTO file_state
           (file_id, relative_path, content_hash, size_bytes, mtime_ns, language, kind, fingerprint, indexed_at, is_deleted)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT(relative_path) DO UPDATE SET
               file_id = excluded.file_id,
               content_hash = excluded.content_hash,
               size_bytes = excluded.size_bytes,
               mtime_ns = excluded.mtime_ns,
               language = excluded.language,
               kind = excluded.kind,
               fingerprint = excluded.fingerprint,
               indexed_at = excluded.indexed_at,
               is_deleted = excluded.is_deleted"#,
    )
    .bind(file_state.file_id.to_string())
    .bind(&file_state.relative_path)
    .bind(&file_state.content_hash)
    .bind(file_state.size_bytes as i64)
    .bind(file_state.mtime_ns)
    .bind(&file_state.language)
    .bind(&file_state.kind)
    .bind(&file_state.fingerprint)
    .bind(file_state.indexed_at.to_rfc3339())
    .bind(i64::from(file_state.is_deleted))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_chunk(tx: &mut Transaction<'_, Sqlite>, chunk: &Chunk) -> OrchestratorResult<()> {
    sqlx::query(
        r#"INSERT INTO chunks
           (chunk_id, file_id, ordinal, kind, start_line, end_line, token_estimate, content, summary, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(chunk.chunk_id.to_string())
    .bind(chunk.file_id.to_string())
    .bind(i64::from(chunk.ordinal))
    .bind(chunk_kind_as_str(&chunk.kind))
    .bind(chunk.start_line.map(i64::from))
    .bind(chunk.end_line.map(i64::from))
    .bind(chunk.token_estimate.map(i64::from))
    .bind(&chunk.content)
    .bind(&chunk.summary)
    .bind(chunk.created_at.to_rfc3339())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_embedding(tx: &mut Transaction<'_, Sqlite>, embedding: &Embedding) -> OrchestratorResult<()> {
    let vector_json = serde_json::to_string(&embedding.vector)?;
    sqlx::query(
        r#"INSERT INTO embeddings (embedding_id, chunk_id, model, dimensions, vector, created_at)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(embedding.embedding_id.to_string())
    .bind(embedding.chunk_id.to_string())
    .bind(&embedding.model)
    .bind(i64::from(embedding.dimensions))
    .bind(vector_json)
    .bind(embedding.created_at.to_rfc3339())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_link(tx: &mut Transaction<'_, Sqlite>, link: &Link) -> OrchestratorResult<()> {
    sqlx::query(
        r#"INSERT INTO links (link_id, source_chunk_id, target_file_id, target_chunk_id, link_type, label, score, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(link.link_id.to_string())
    .bind(link.source_chunk_id.to_string())
    .bind(link.target_file_id.to_string())
    .bind(link.target_chunk_id.map(|c| c.to_string()))
    .bind(link_type_as_str(&link.link_type))
    .bind(&link.label)
    .bind(link.score)
    .bind(link.created_at.to_rfc3339())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_symbol(tx: &mut Transaction<'_, Sqlite>, symbol: &Symbol) -> OrchestratorResult<()> {
    sqlx::query(
        r#"INSERT INTO symbols
           (symbol_id, file_id, chunk_id, symbol_type, name, qualified_name, signature, start_line, end_line, language)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(symbol.symbol_id.to_string())
    .bind(symbol.file_id.to_string())
    .bind(symbol.chunk_id.to_string())
    .bind(symbol_type_as_str(&symbol.symbol_type))
    .bind(&symbol.name)
    .bind(&symbol.qualified_name)
    .bind(&symbol.signature)
    .bind(i64::from(symbol.start_line))
    .bind(i64::from(symbol.end_line))
    .bind(&symbol.language)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn row_to_file_state(row: &sqlx::sqlite::SqliteRow) -> OrchestratorResult<FileState> {
    Ok(FileState {
        file_id: FileId::from_str(&row.try_get::<String, _>("file_id")?)?,
        relative_path: row.try_get("relative_path")?,
        content_hash: row.try_get("content_hash")?,
        size_bytes: row.try_get::<i64, _>("size_bytes")? as u64,
        mtime_ns: row.try_get("mtime_ns")?,
        language: row.try_get("language")?,
        kind: row.try_get("kind")?,
        fingerprint: row.try_get("fingerprint")?,
        indexed_at: parse_rfc3339(row.try_get("indexed_at")?)?,
        is_deleted: row.try_get::<i64, _>("is_deleted")? != 0,
    })
}

fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> OrchestratorResult<Chunk> {
    let kind: String = row.try_get("kind")?;
    Ok(Chunk {
        chunk_id: ChunkId::from_str(&row.try_get::<String, _>("chunk_id")?)?,
        file_id: FileId::from_str(&row.try_get::<String, _>("file_id")?)?,
        ordinal: row.try_get::<i64, _>("ordinal")? as u32,
        kind: chunk_kind_from_str(&kind)
            .ok_or_else(|| OrchestratorError::InvalidInput("unknown chunk kind".to_string()))?,
        start_line: row.try_get::<Option<i64>, _>("start_line")?.map(|v| v as u32),
        end_line: row.try_get::<Option<i64>, _>("end_line")?.map(|v| v as u32),
        token_estimate: row.try_get::<Option<i64>, _>("token_estimate")?.map(|v| v as u32),
        content: row.try_get("content")?,
        summary: row.try_get("summary")?,
        created_at: parse_rfc3339(row.try_get("created_at")?)?,
    })
}

fn row_to_embedding(row: &sqlx::sqlite::SqliteRow) -> OrchestratorResult<Embedding> {
    let vector_json: String = row.try_get("vector")?;
    Ok(Embedding {
        embedding_id: EmbeddingId::from_str(&row.try_get::<String, _>("embedding_id")?)?,
        chunk_id: ChunkId::from_str(&row.try_get::<String, _>("chunk_id")?)?,
        model: row.try_get("model")?,
        dimensions: row.try_get::<i64, _>("dimensions")? as u32,
        vector: serde_json::from_str(&vector_json)?,
        created_at: parse_rfc3339(row.try_get("created_at")?)?,
    })
}

fn row_to_link(row: &sqlx::sqlite::SqliteRow) -> OrchestratorResult<Link> {
    let link_type: String = row.try_get("link_type")?;
    let target_chunk_id: Option<String> = row.try_get("target_chunk_id")?;
    Ok(Link {
        link_id: LinkId::from_str(&row.try_get::<String, _>("link_id")?)?,
        source_chunk_id: ChunkId::from_str(&row.try_get::<String, _>("source_chunk_id")?)?,
        target_file_id: FileId::from_str(&row.try_get::<String, _>("target_file_id")?)?,
        target_chunk_id: target_chunk_id.map(|s| ChunkId::from_str(&s)).transpose()?,
        link_type: link_type_from_str(&link_type)
            .ok_or_else(|| OrchestratorError::InvalidInput("unknown link type".to_string()))?,
        label: row.try_get("label")?,
        score: row.try_get("score")?,
        created_at: parse_rfc3339(row.try_get("created_at")?)?,
    })
}

fn row_to_symbol(row: &sqlx::sqlite::SqliteRow) -> OrchestratorResult<Symbol> {
    let symbol_type: String = row.try_get("symbol_type")?;
    Ok(Symbol {
        symbol_id: SymbolId::from_str(&row.try_get::<String, _>("symbol_id")?)?,
        file_id: FileId::from_str(&row.try_get::<String, _>("file_id")?)?,
        chunk_id: ChunkId::from_str(&row.try_get::<String, _>("chunk_id")?)?,
        symbol_type: symbol_type_from_str(&symbol_type)
            .ok_or_else(|| OrchestratorError::InvalidInput("unknown symbol type".to_string()))?,
        name: row.try_get("name")?,
        qualified_name: row.try_get("qualified_name")?,
        signature: row.try_get("signature")?,
        start_line: row.try_get::<i64, _>("start_line")? as u32,
        end_line: row.try_get::<i64, _>("end_line")? as u32,
        language: row.try_get("language")?,
    })
}

fn parse_rfc3339(s: String) -> OrchestratorResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| OrchestratorError::InvalidInput(format!("bad timestamp {s}: {e}")))
}

fn chunk_kind_as_str(kind: &ChunkKind) -> &'static str {
    match kind {
        ChunkKind::Markdown => "markdown",
        ChunkKind::Code => "code",
        ChunkKind::PlainText => "plain_text",
    }
}

fn chunk_kind_from_str(s: &str) -> Option<ChunkKind> {
    match s {
        "markdown" => Some(ChunkKind::Markdown),
        "code" => Some(ChunkKind::Code),
        "plain_text" => Some(ChunkKind::PlainText),
        _ => None,
    }
}

fn link_type_as_str(link_type: &LinkType) -> &'static str {
    match link_type {
        LinkType::Import => "import",
        LinkType::Reference => "reference",
        LinkType::CoChanged => "co_changed",
        LinkType::Commit => "commit",
    }
}

fn link_type_from_str(s: &str) -> Option<LinkType> {
    match s {
        "import" => Some(LinkType::Import),
        "reference" => Some(LinkType::Reference),
        "co_changed" => Some(LinkType::CoChanged),
        "commit" => Some(LinkType::Commit),
        _ => None,
    }
}

fn symbol_type_as_str(symbol_type: &SymbolType) -> &'static str {
    match symbol_type {
        SymbolType::Class => "class",
        SymbolType::Interface => "interface",
        SymbolType::Function => "function",
        SymbolType::Method => "method",
        SymbolType::Property => "property",
        SymbolType::Variable => "variable",
        SymbolType::Import => "import",
    }
}

fn symbol_type_from_str(s: &str) -> Option<SymbolType> {
    match s {
        "class" => Some(SymbolType::Class),
        "interface" => Some(SymbolType::Interface),
        "function" => Some(SymbolType::Function),
        "method" => Some(SymbolType::Method),
        "property" => Some(SymbolType::Property),
        "variable" => Some(SymbolType::Variable),
        "import" => Some(SymbolType::Import),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ChunkKind;

    async fn setup() -> SqliteContextRepository {
        let pool = super::super::connection::create_test_pool().await.unwrap();
        super::super::migrations::run_migrations(&pool).await.unwrap();
        SqliteContextRepository::new(pool)
    }

    fn sample_file_state(path: &str) -> FileState {
        FileState::new(path, "hash1", 100, 1)
    }

    #[tokio::test]
    async fn replace_then_fetch_round_trips() {
        let repo = setup().await;
        let file_state = sample_file_state("src/lib.rs");
        let chunk = Chunk::new(file_state.file_id, 0, ChunkKind::Code, "fn main() {}");
        repo.replace_file_artifacts(file_state.clone(), vec![chunk.clone()], vec![], vec![], vec![])
            .await
            .unwrap();

        let fetched = repo.fetch_file_artifacts_by_path("src/lib.rs").await.unwrap().unwrap();
        assert_eq!(fetched.chunks.len(), 1);
        assert_eq!(fetched.chunks[0].content, "fn main() {}");
    }

    #[tokio::test]
    async fn rollback_restores_prior_snapshot_on_failure() {
        let repo = setup().await;
        let file_state = sample_file_state("src/a.rs");
        let original_chunk = Chunk::new(file_state.file_id, 0, ChunkKind::Code, "original");
        repo.replace_file_artifacts(file_state.clone(), vec![original_chunk.clone()], vec![], vec![], vec![])
            .await
            .unwrap();

        // Force a failure: duplicate ordinal violates the chunks (file_id, ordinal) unique
        // constraint on the second insert, simulating a mid-write error.
        let new_chunk_a = Chunk::new(file_state.file_id, 1, ChunkKind::Code, "new-a");
        let new_chunk_b = Chunk::new(file_state.file_id, 1, ChunkKind::Code, "new-b");
        let mut updated_state = file_state.clone();
        updated_state.content_hash = "hash2".to_string();

        let result = repo
            .replace_file_artifacts(
                updated_state,
                vec![new_chunk_a, new_chunk_b],
                vec![],
                vec![],
                vec![],
            )
            .await;
        assert!(result.is_err());

        let restored = repo.fetch_file_artifacts_by_path("src/a.rs").await.unwrap().unwrap();
        assert_eq!(restored.file_state.content_hash, "hash1");
        assert_eq!(restored.chunks.len(), 1);
        assert_eq!(restored.chunks[0].content, "original");
    }

    #[tokio::test]
    async fn delete_file_artifacts_removes_everything() {
        let repo = setup().await;
        let file_state = sample_file_state("src/gone.rs");
        let chunk = Chunk::new(file_state.file_id, 0, ChunkKind::Code, "x");
        repo.replace_file_artifacts(file_state, vec![chunk], vec![], vec![], vec![]).await.unwrap();

        repo.delete_file_artifacts("src/gone.rs").await.unwrap();
        assert!(repo.fetch_file_artifacts_by_path("src/gone.rs").await.unwrap().is_none());
    }
}
