//! Synthetic requests in flight through the architecture.

use serde::{Deserialize, Serialize};

/// Processing stage of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }
}

/// A request travelling hop by hop through the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveRequest {
    pub id: String,
    /// Client node that generated the request
    pub source_node_id: String,
    /// Destination of the current hop
    pub target_node_id: String,
    /// Nodes already visited, starting with the client
    pub path: Vec<String>,
    /// Simulated time the request entered the system
    pub start_time: u64,
    /// Time spent so far on the current hop in milliseconds
    pub current_latency: f64,
    pub payload_kb: f64,
    pub status: RequestStatus,
    /// Fraction of the current hop completed
    pub progress: f64,
}

impl ActiveRequest {
    /// Creates a request leaving `source` toward `target`.
    pub fn new(
        id: String,
        source: &str,
        target: &str,
        start_time: u64,
        payload_kb: f64,
    ) -> Self {
        Self {
            id,
            source_node_id: source.to_string(),
            target_node_id: target.to_string(),
            path: vec![source.to_string()],
            start_time,
            current_latency: 0.0,
            payload_kb,
            status: RequestStatus::Pending,
            progress: 0.0,
        }
    }

    /// Node the current hop departed from.
    pub fn previous_node(&self) -> &str {
        self.path
            .last()
            .map(String::as_str)
            .unwrap_or(&self.source_node_id)
    }

    /// Returns true if the request already passed through `node_id`.
    pub fn has_visited(&self, node_id: &str) -> bool {
        self.path.iter().any(|visited| visited == node_id)
    }

    /// Accumulates one tick toward a hop costing `hop_latency_ms`.
    ///
    /// Returns true once the hop is complete.
    pub fn advance(&mut self, tick_ms: f64, hop_latency_ms: f64) -> bool {
        self.status = RequestStatus::Processing;
        self.current_latency += tick_ms;
        self.progress = if hop_latency_ms > 0.0 {
            (self.current_latency / hop_latency_ms).min(1.0)
        } else {
            1.0
        };
        self.progress >= 1.0
    }

    /// Points the request at its next hop.
    pub fn retarget(&mut self, next: &str) {
        self.target_node_id = next.to_string();
        self.current_latency = 0.0;
        self.progress = 0.0;
        self.status = RequestStatus::Processing;
    }

    /// End-to-end latency at simulated time `now`.
    pub fn elapsed(&self, now: u64) -> f64 {
        now.saturating_sub(self.start_time) as f64
    }
}
