//! Engine lifecycle events and the pub/sub bus that carries them.
//!
//! The bus is a side channel for tracing and live streaming: emitting is
//! fire-and-forget, a slow or dropped subscriber can never stall or abort
//! the pipeline, and payloads are immutable JSON-serializable snapshots
//! suitable for forwarding verbatim as Server-Sent-Events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::process::{WorkflowExecution, WorkflowStepExecution};

/// A lifecycle event emitted by the workflow engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowEvent {
    /// Execution is about to start.
    PreExecution {
        workflow: String,
        document: String,
        at: DateTime<Utc>,
    },

    /// A step is about to run.
    PreStepExecution {
        workflow: String,
        step_index: usize,
        at: DateTime<Utc>,
    },

    /// A step finished (successfully or not).
    PostStepExecution {
        workflow: String,
        step_index: usize,
        execution: WorkflowStepExecution,
        at: DateTime<Utc>,
    },

    /// Execution finished; carries the full record tree.
    PostExecution {
        execution: WorkflowExecution,
        at: DateTime<Utc>,
    },
}

impl WorkflowEvent {
    /// Stable event name, used as the SSE event type and in trace file
    /// names.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PreExecution { .. } => "preExecution",
            Self::PreStepExecution { .. } => "preStepExecution",
            Self::PostStepExecution { .. } => "postStepExecution",
            Self::PostExecution { .. } => "postExecution",
        }
    }
}

/// In-process pub/sub for workflow events.
///
/// Thread-safe and cloneable. Emitting to a bus with no subscribers is a
/// no-op; lagging subscribers drop old events rather than applying
/// backpressure to the engine.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
    /// Create a bus with the default capacity (256 buffered events per
    /// subscriber).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Send errors (no active subscribers) are ignored.
    pub fn emit(&self, event: WorkflowEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_without_subscribers_is_a_noop() {
        let bus = EventBus::new();
        bus.emit(WorkflowEvent::PreExecution {
            workflow: "wf-1".into(),
            document: "doc-1".into(),
            at: Utc::now(),
        });
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.emit(WorkflowEvent::PreExecution {
            workflow: "wf-1".into(),
            document: "doc-1".into(),
            at: Utc::now(),
        });
        bus.emit(WorkflowEvent::PreStepExecution {
            workflow: "wf-1".into(),
            step_index: 0,
            at: Utc::now(),
        });

        assert_eq!(receiver.recv().await.unwrap().kind(), "preExecution");
        assert_eq!(receiver.recv().await.unwrap().kind(), "preStepExecution");
    }

    #[test]
    fn events_serialize_with_a_type_tag() {
        let event = WorkflowEvent::PreStepExecution {
            workflow: "wf-1".into(),
            step_index: 2,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PreStepExecution");
        assert_eq!(json["step_index"], 2);
    }
}
