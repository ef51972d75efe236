//! Directive parsing, task classification, strategy selection and agent
//! selection: the decision pipeline that turns free text plus a task into a
//! routed, agent-assigned unit of work (spec.md §4.2–§4.5).

pub mod agent_selector;
pub mod directive_parser;
pub mod routing;
pub mod strategy_picker;
pub mod task_classifier;

pub use agent_selector::{select as select_agents, DEFAULT_CONSENSUS_PANEL_SIZE, MIN_CONSENSUS_PANEL_SIZE};
pub use directive_parser::parse as parse_directive;
pub use routing::{route, route_with_directive, RoutingDecision};
pub use strategy_picker::{calibrate, pick as pick_strategy, RoutingChoice, StrategyMetrics, StrategyThresholds};
pub use task_classifier::{classify, Classification};
