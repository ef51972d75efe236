//! A single recorded state-machine transition.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::task::TaskStatus;

/// One entry in a task's append-only transition history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: TaskStatus,
    pub to: TaskStatus,
    pub timestamp: DateTime<Utc>,
    pub metadata: HashMap<String, String>,
}

impl StateTransition {
    #[must_use]
    pub fn new(from: TaskStatus, to: TaskStatus, metadata: HashMap<String, String>) -> Self {
        Self {
            from,
            to,
            timestamp: Utc::now(),
            metadata,
        }
    }
}
