//! sqlx/SQLite-backed implementation of the storage ports.

pub mod connection;
pub mod context_repository;
pub mod decision_repository;
pub mod migrations;
pub mod proposal_repository;
pub mod sequences;
pub mod task_repository;

pub use connection::{create_pool, create_test_pool, PoolConfig};
pub use context_repository::SqliteContextRepository;
pub use decision_repository::SqliteDecisionRepository;
pub use migrations::run_migrations;
pub use proposal_repository::SqliteProposalRepository;
pub use sequences::SequenceAllocator;
pub use task_repository::SqliteTaskRepository;
