//! Orchestrator kernel: a multi-agent task orchestrator.
//!
//! Accepts a natural-language directive, classifies the resulting task,
//! picks a routing strategy (solo, consensus, sequential, or parallel),
//! dispatches work to agents, reconciles their responses into a decision,
//! and persists every state transition with strong invariants for
//! observability.
//!
//! This crate covers the orchestration kernel plus its supporting context
//! indexing/retrieval engine — the directive parser, task classifier,
//! strategy picker, agent selector, workflow runtime, consensus engine, and
//! the file discovery/chunking/embedding/retrieval pipeline. The HTTP/SSE
//! surface, HTML rendering, MCP tool wiring, CLI bootstrapping, config
//! loading, and the embedder model binding itself are external
//! collaborators this crate only defines contracts for (see
//! [`domain::ports`]).

pub mod analytics;
pub mod classification;
pub mod consensus;
pub mod domain;
pub mod events;
pub mod identifiers;
pub mod indexing;
pub mod registry;
pub mod retrieval;
pub mod state_machine;
pub mod storage;
pub mod workflow;

pub use domain::errors::{OrchestratorError, OrchestratorResult};
pub use domain::models::{Agent, RoutingStrategy, Task, TaskStatus, TaskType};
pub use identifiers::{AgentId, TaskId};
