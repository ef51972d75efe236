//! Typed event bus: non-blocking per-subscriber publish over bounded
//! channels (spec.md §4.12).
//!
//! Grounded on the teacher's `services/event_bus.rs` `UnifiedEvent`
//! envelope, simplified per DESIGN.md's Open Question #4: rather than one
//! shared `broadcast` channel (whose lagging-receiver semantics apply
//! uniformly to every subscriber), this keeps one bounded `mpsc::Sender`
//! per subscription and does a non-blocking `try_send`, so a slow
//! subscriber drops its own events without affecting anyone else's.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::models::{RoutingStrategy, TaskStatus};
use crate::identifiers::TaskId;

/// Default bounded capacity for a subscriber's buffer before events start
/// dropping (spec.md §4.12: "if a subscriber's buffer is full or closed,
/// the drop is logged and publication continues").
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 256;

/// The event payload kinds this crate publishes (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventKind {
    TaskCreated {
        task_id: TaskId,
    },
    TaskUpdated {
        task_id: TaskId,
    },
    TaskRouted {
        task_id: TaskId,
        strategy: RoutingStrategy,
    },
    WorkflowStarted {
        task_id: TaskId,
    },
    WorkflowCompleted {
        task_id: TaskId,
    },
    WorkflowFailed {
        task_id: TaskId,
        reason: String,
    },
    StateTransition {
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },
    IndexingProgress {
        total: u64,
        processed: u64,
        succeeded: u64,
        failed: u64,
        last_error: Option<String>,
    },
}

impl EventKind {
    /// The subscription key events of this kind are routed under.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        match self {
            Self::TaskCreated { .. } => EventType::TaskCreated,
            Self::TaskUpdated { .. } => EventType::TaskUpdated,
            Self::TaskRouted { .. } => EventType::TaskRouted,
            Self::WorkflowStarted { .. } => EventType::WorkflowStarted,
            Self::WorkflowCompleted { .. } => EventType::WorkflowCompleted,
            Self::WorkflowFailed { .. } => EventType::WorkflowFailed,
            Self::StateTransition { .. } => EventType::StateTransition,
            Self::IndexingProgress { .. } => EventType::IndexingProgress,
        }
    }
}

/// The discriminant subscribers key their subscription on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    TaskCreated,
    TaskUpdated,
    TaskRouted,
    WorkflowStarted,
    WorkflowCompleted,
    WorkflowFailed,
    StateTransition,
    IndexingProgress,
}

/// An envelope wrapping a published event with a monotonic sequence
/// number and timestamp, mirroring the teacher's `UnifiedEvent` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

/// A subscriber's receiving half. A lazy, cancellable sequence: dropping
/// it (or calling [`Subscription::cancel`]) stops further delivery.
pub struct Subscription {
    receiver: mpsc::Receiver<Event>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    pub fn cancel(mut self) {
        self.receiver.close();
    }
}

struct Subscriber {
    sender: mpsc::Sender<Event>,
}

/// Engine-scoped publish/subscribe hub. Construct one per orchestrator
/// instance (spec.md §9: global singletons re-architected as explicit
/// engine-scoped services).
pub struct EventBus {
    subscribers: DashMap<EventType, Vec<Subscriber>>,
    sequence: AtomicU64,
    capacity: usize,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SUBSCRIBER_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            sequence: AtomicU64::new(1),
            capacity,
        }
    }

    /// Subscribe to one event type. Returns a [`Subscription`] whose
    /// `recv` yields events of that type as they are published.
    pub fn subscribe(&self, event_type: EventType) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.capacity);
        self.subscribers.entry(event_type).or_default().push(Subscriber { sender });
        Subscription { receiver }
    }

    /// Publish an event. Non-blocking: a subscriber whose buffer is full
    /// or whose receiver has been dropped has the send logged and skipped;
    /// publication continues for every other subscriber (spec.md §4.12).
    pub fn publish(&self, kind: EventKind) {
        let event = Event {
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            timestamp: Utc::now(),
            kind,
        };
        let event_type = event.kind.event_type();
        let Some(mut subscribers) = self.subscribers.get_mut(&event_type) else {
            return;
        };
        subscribers.retain_mut(|subscriber| match subscriber.sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(?event_type, "subscriber buffer full, dropping event");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// Shut down the bus: close every subscriber's channel so pending
    /// `recv` calls resolve to `None` (spec.md §4.12 shutdown semantics).
    pub fn shutdown(&self) {
        self.subscribers.clear();
    }

    #[must_use]
    pub fn subscriber_count(&self, event_type: EventType) -> usize {
        self.subscribers.get(&event_type).map_or(0, |s| s.len())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn a supervised task draining `subscription` through `handler`. If
/// `handler` panics the task ends but the bus itself is unaffected — other
/// subscribers keep receiving (spec.md §4.12 "supervised handler tasks").
pub fn spawn_handler<F>(mut subscription: Subscription, mut handler: F) -> JoinHandle<()>
where
    F: FnMut(Event) + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            handler(event);
        }
    })
}

/// Test/diagnostic helper: count how many subscriptions exist per type.
#[must_use]
pub fn subscription_counts(bus: &EventBus) -> HashMap<EventType, usize> {
    [
        EventType::TaskCreated,
        EventType::TaskUpdated,
        EventType::TaskRouted,
        EventType::WorkflowStarted,
        EventType::WorkflowCompleted,
        EventType::WorkflowFailed,
        EventType::StateTransition,
        EventType::IndexingProgress,
    ]
    .into_iter()
    .map(|t| (t, bus.subscriber_count(t)))
    .collect()
}
