//! Domain records shared across the orchestration kernel and the context
//! indexing/retrieval engine.

pub mod agent;
pub mod chunk;
pub mod decision;
pub mod directive;
pub mod embedding;
pub mod file_state;
pub mod link;
pub mod proposal;
pub mod state_transition;
pub mod symbol;
pub mod task;

pub use agent::{Agent, AgentStatus, AgentType, Capability};
pub use chunk::{Chunk, ChunkKind};
pub use decision::Decision;
pub use directive::{Signal, UserDirective};
pub use embedding::Embedding;
pub use file_state::{ChangeKind, FileState};
pub use link::{Link, LinkType};
pub use proposal::{InputType, Proposal, TokenUsage};
pub use state_transition::StateTransition;
pub use symbol::{Symbol, SymbolType};
pub use task::{RoutingStrategy, Task, TaskStatus, TaskType};
