//! Embedded schema migrations, applied idempotently on startup.
//!
//! Grounded on the teacher's `Migrator` (`adapters/sqlite/migrations.rs`):
//! a `schema_migrations` version table gates a list of embedded SQL
//! scripts so repeated startups are no-ops.

use sqlx::SqlitePool;

use crate::domain::errors::{OrchestratorError, OrchestratorResult};

struct Migration {
    version: i64,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                task_type TEXT NOT NULL,
                status TEXT NOT NULL,
                strategy TEXT,
                assignees TEXT NOT NULL,
                dependencies TEXT NOT NULL,
                complexity INTEGER NOT NULL,
                risk INTEGER NOT NULL,
                metadata TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
            CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);

            CREATE TABLE IF NOT EXISTS proposals (
                id TEXT PRIMARY KEY,
                task_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                input_type TEXT NOT NULL,
                content TEXT NOT NULL,
                confidence REAL NOT NULL,
                token_input INTEGER NOT NULL,
                token_output INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(task_id, agent_id)
            );
            CREATE INDEX IF NOT EXISTS idx_proposals_task ON proposals(task_id);

            CREATE TABLE IF NOT EXISTS decisions (
                id TEXT PRIMARY KEY,
                task_id TEXT NOT NULL UNIQUE,
                considered TEXT NOT NULL,
                selected TEXT NOT NULL,
                winner_id TEXT,
                agreement_rate REAL NOT NULL,
                rationale TEXT NOT NULL,
                decided_at TEXT NOT NULL,
                consensus_achieved INTEGER NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        sql: r#"
            CREATE TABLE IF NOT EXISTS file_state (
                file_id TEXT PRIMARY KEY,
                relative_path TEXT NOT NULL UNIQUE,
                content_hash TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                mtime_ns INTEGER NOT NULL,
                language TEXT,
                kind TEXT,
                fingerprint TEXT,
                indexed_at TEXT NOT NULL,
                is_deleted INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS chunks (
                chunk_id TEXT PRIMARY KEY,
                file_id TEXT NOT NULL,
                ordinal INTEGER NOT NULL,
                kind TEXT NOT NULL,
                start_line INTEGER,
                end_line INTEGER,
                token_estimate INTEGER,
                content TEXT NOT NULL,
                summary TEXT,
                created_at TEXT NOT NULL,
                UNIQUE(file_id, ordinal)
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_file ON chunks(file_id);

            CREATE TABLE IF NOT EXISTS embeddings (
                embedding_id TEXT PRIMARY KEY,
                chunk_id TEXT NOT NULL,
                model TEXT NOT NULL,
                dimensions INTEGER NOT NULL,
                vector TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_embeddings_chunk ON embeddings(chunk_id);
            CREATE INDEX IF NOT EXISTS idx_embeddings_model ON embeddings(model);

            CREATE TABLE IF NOT EXISTS links (
                link_id TEXT PRIMARY KEY,
                source_chunk_id TEXT NOT NULL,
                target_file_id TEXT NOT NULL,
                target_chunk_id TEXT,
                link_type TEXT NOT NULL,
                label TEXT NOT NULL,
                score REAL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_links_source ON links(source_chunk_id);
            CREATE INDEX IF NOT EXISTS idx_links_target ON links(target_file_id);

            CREATE TABLE IF NOT EXISTS symbols (
                symbol_id TEXT PRIMARY KEY,
                file_id TEXT NOT NULL,
                chunk_id TEXT NOT NULL,
                symbol_type TEXT NOT NULL,
                name TEXT NOT NULL,
                qualified_name TEXT,
                signature TEXT,
                start_line INTEGER NOT NULL,
                end_line INTEGER NOT NULL,
                language TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_id);
            CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);

            CREATE TABLE IF NOT EXISTS sequences (
                name TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );
            INSERT OR IGNORE INTO sequences (name, value) VALUES
                ('file_state_seq', 0), ('chunks_seq', 0), ('embeddings_seq', 0), ('links_seq', 0);
        "#,
    },
];

/// Apply every migration with `version` greater than the schema's current
/// version, in order, recording each as it succeeds.
pub async fn run_migrations(pool: &SqlitePool) -> OrchestratorResult<usize> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .execute(pool)
    .await?;

    let current: (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
        .fetch_one(pool)
        .await?;

    let mut applied = 0;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current.0) {
        sqlx::raw_sql(migration.sql)
            .execute(pool)
            .await
            .map_err(|e| OrchestratorError::PersistenceFailure {
                task_id: format!("migration-{}", migration.version),
                source: anyhow::Error::new(e),
            })?;
        sqlx::query("INSERT OR IGNORE INTO schema_migrations (version) VALUES (?)")
            .bind(migration.version)
            .execute(pool)
            .await?;
        applied += 1;
    }
    Ok(applied)
}
