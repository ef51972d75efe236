//! Workflow runtime: per-task serialization, strategy execution,
//! checkpoint/resume, and event publication (spec.md §4.8).

pub mod checkpoint;
pub mod executors;
pub mod runtime;
pub mod types;

pub use checkpoint::CheckpointStore;
pub use executors::{
    ConsensusExecutor, ExecutionContext, ParallelExecutor, SequentialExecutor, SoloExecutor, WorkflowExecutor,
};
pub use runtime::{WorkflowRuntime, DEFAULT_CONSENSUS_WAIT};
pub use types::{AgentOutcome, Checkpoint, WorkflowResult, WorkflowStep};
