//! Ports: trait boundaries the core consumes from or exposes to external
//! collaborators (storage, agents, the embedder, git history).

pub mod agent_invoker;
pub mod context_repository;
pub mod decision_repository;
pub mod embedder;
pub mod git_history;
pub mod proposal_repository;
pub mod task_repository;

pub use agent_invoker::{AgentInvocationOutcome, AgentInvoker, MockAgentInvoker};
pub use context_repository::ContextRepository;
pub use decision_repository::DecisionRepository;
pub use embedder::{Embedder, MockEmbedder};
pub use git_history::{CoChangedFile, CommitRecord, GitHistoryProvider, MockGitHistoryProvider};
pub use proposal_repository::ProposalRepository;
pub use task_repository::{Page, TaskFilter, TaskRepository};
