//! Inbound job lifecycle events.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Source namespace of job lifecycle events
pub const JOB_EVENT_SOURCE: &str = "aws.ecs";

/// Detail type of task state transitions
pub const TASK_STATE_CHANGE: &str = "ECS Task State Change";

/// A job lifecycle event as delivered by the event bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Emitting service namespace
    pub source: String,
    /// Kind of event within the namespace
    #[serde(rename = "detail-type", alias = "detailType")]
    pub detail_type: String,
    /// Event payload
    #[serde(default)]
    pub detail: Map<String, Value>,
}

impl LifecycleEvent {
    /// Create an event with an empty detail
    #[must_use]
    pub fn new(source: impl Into<String>, detail_type: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            detail_type: detail_type.into(),
            detail: Map::new(),
        }
    }

    /// Create a task state change event
    #[must_use]
    pub fn task_state_change() -> Self {
        Self::new(JOB_EVENT_SOURCE, TASK_STATE_CHANGE)
    }

    /// Set a detail field
    #[must_use]
    pub fn with_detail(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.detail.insert(field.into(), value.into());
        self
    }

    /// Get a detail field
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.detail.get(name)
    }
}
