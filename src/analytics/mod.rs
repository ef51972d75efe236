//! Token, performance, and decision analytics with alert thresholds
//! (spec.md §2 "Analytics & metrics").
//!
//! Grounded on the teacher's `services/cost_tracker.rs` and
//! `services/budget_tracker.rs`: accumulate-on-event, query-derived-stats
//! services, engine-scoped rather than global singletons (spec.md §9).
//! This crate's core stops at the data these accumulators expose; rendering
//! them into a dashboard is the excluded HTTP/metrics surface (spec.md §1).

pub mod alerts;
pub mod decisions;
pub mod performance;
pub mod tokens;

pub use alerts::{Alert, AlertThresholds};
pub use decisions::DecisionAnalytics;
pub use performance::PerformanceAnalytics;
pub use tokens::TokenAnalytics;
