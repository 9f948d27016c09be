//! Typed, timestamped notifications emitted during a run.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kinds of simulation events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    RequestSent,
    RequestProcessed,
    RequestCompleted,
    RequestFailed,
    CacheHit,
    CacheMiss,
    DbQuery,
    QueueEnqueue,
    QueueDequeue,
    BacklogWarning,
    NodeScaled,
    NodeOverloaded,
    SimulationStarted,
    SimulationPaused,
    SimulationResumed,
    SimulationStopped,
    SimulationCompleted,
}

impl EventType {
    /// Returns string representation of event type for log filtering.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::RequestSent => "REQUEST_SENT",
            EventType::RequestProcessed => "REQUEST_PROCESSED",
            EventType::RequestCompleted => "REQUEST_COMPLETED",
            EventType::RequestFailed => "REQUEST_FAILED",
            EventType::CacheHit => "CACHE_HIT",
            EventType::CacheMiss => "CACHE_MISS",
            EventType::DbQuery => "DB_QUERY",
            EventType::QueueEnqueue => "QUEUE_ENQUEUE",
            EventType::QueueDequeue => "QUEUE_DEQUEUE",
            EventType::BacklogWarning => "BACKLOG_WARNING",
            EventType::NodeScaled => "NODE_SCALED",
            EventType::NodeOverloaded => "NODE_OVERLOADED",
            EventType::SimulationStarted => "SIMULATION_STARTED",
            EventType::SimulationPaused => "SIMULATION_PAUSED",
            EventType::SimulationResumed => "SIMULATION_RESUMED",
            EventType::SimulationStopped => "SIMULATION_STOPPED",
            EventType::SimulationCompleted => "SIMULATION_COMPLETED",
        }
    }

    /// Returns true for per-request traffic events.
    pub fn is_request_event(&self) -> bool {
        matches!(
            self,
            EventType::RequestSent
                | EventType::RequestProcessed
                | EventType::RequestCompleted
                | EventType::RequestFailed
        )
    }

    /// Returns true for run lifecycle events.
    pub fn is_lifecycle_event(&self) -> bool {
        matches!(
            self,
            EventType::SimulationStarted
                | EventType::SimulationPaused
                | EventType::SimulationResumed
                | EventType::SimulationStopped
                | EventType::SimulationCompleted
        )
    }
}

/// Display severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Success,
}

/// A single emitted event. Immutable once appended to the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    pub id: u64,
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Simulated time in milliseconds
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_path: Option<Vec<String>>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    pub severity: Severity,
}

/// Event fields supplied by the emitter; the log assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct EventDraft {
    event_type: EventType,
    severity: Severity,
    message: String,
    node_id: Option<String>,
    source_path: Option<Vec<String>>,
    target_path: Option<Vec<String>>,
    metadata: Option<Map<String, Value>>,
}

impl EventDraft {
    pub fn new(event_type: EventType, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            event_type,
            severity,
            message: message.into(),
            node_id: None,
            source_path: None,
            target_path: None,
            metadata: None,
        }
    }

    pub fn node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn source_path(mut self, path: Vec<String>) -> Self {
        self.source_path = Some(path);
        self
    }

    pub fn target_path(mut self, path: Vec<String>) -> Self {
        self.target_path = Some(path);
        self
    }

    /// Attaches one metadata field.
    pub fn meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }
}

/// Append-only event log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<SimulationEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a drafted event at simulated time `timestamp`.
    pub fn append(&mut self, draft: EventDraft, timestamp: u64) -> &SimulationEvent {
        let id = self.events.len() as u64 + 1;
        self.events.push(SimulationEvent {
            id,
            event_type: draft.event_type,
            timestamp,
            node_id: draft.node_id,
            source_path: draft.source_path,
            target_path: draft.target_path,
            message: draft.message,
            metadata: draft.metadata,
            severity: draft.severity,
        });
        &self.events[self.events.len() - 1]
    }

    pub fn events(&self) -> &[SimulationEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Counts events of the given kind.
    pub fn count(&self, event_type: EventType) -> usize {
        self.of_type(event_type).count()
    }

    /// Iterates over events of the given kind.
    pub fn of_type(&self, event_type: EventType) -> impl Iterator<Item = &SimulationEvent> {
        self.events
            .iter()
            .filter(move |event| event.event_type == event_type)
    }

    /// Iterates over events of the given severity.
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &SimulationEvent> {
        self.events
            .iter()
            .filter(move |event| event.severity == severity)
    }
}
