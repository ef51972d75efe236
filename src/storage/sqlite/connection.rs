//! SQLite connection pool management, mirroring the teacher's
//! `withConnection`/pooled-access pattern (spec.md §6).

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use crate::domain::errors::{OrchestratorError, OrchestratorResult};

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 8,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Open (creating if missing) a WAL-mode SQLite pool at `database_url`
/// (e.g. `sqlite:///var/lib/orchestrator/kernel.db` or `sqlite::memory:`).
pub async fn create_pool(database_url: &str, config: Option<PoolConfig>) -> OrchestratorResult<SqlitePool> {
    let config = config.unwrap_or_default();
    ensure_database_directory(database_url)?;

    let connect_options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| OrchestratorError::InvalidInput(format!("invalid database url {database_url}: {e}")))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_options)
        .await
        .map_err(OrchestratorError::from)?;

    Ok(pool)
}

/// In-memory pool for tests: a single shared connection so every handle in
/// the test sees the same database.
pub async fn create_test_pool() -> OrchestratorResult<SqlitePool> {
    let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("static in-memory URL always parses")
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .shared_cache(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options)
        .await
        .map_err(OrchestratorError::from)
}

fn ensure_database_directory(database_url: &str) -> OrchestratorResult<()> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);

    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                OrchestratorError::InvalidInput(format!("cannot create database directory: {e}"))
            })?;
        }
    }
    Ok(())
}
