//! EventSink port
//! Optional channel for device state-change notifications

use crate::domain::value_objects::ChildKind;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Added,
    Removed,
}

/// A device or service joined or left this manager
#[derive(Debug, Clone)]
pub struct StateEvent {
    pub identifier: String,
    pub label: String,
    pub kind: ChildKind,
    pub change: StateChange,
}

/// Port for publishing state-change events; all calls are best-effort
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: StateEvent);

    /// Drop the subscription; called once during shutdown
    async fn release(&self);
}
