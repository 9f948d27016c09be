//! Point-in-time view of a simulation for hosts.

use std::collections::BTreeMap;

use archsim_core::{
    EdgeMetrics, MetricsSnapshot, NodeMetrics, SimulationConfig, SimulationEvent, SystemMetrics,
};
use serde::{Deserialize, Serialize};

use crate::lifecycle::SimulationStatus;
use crate::request::ActiveRequest;

/// Copy of the engine's internal state at the moment it was requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub status: SimulationStatus,
    pub config: SimulationConfig,
    /// Simulated time in milliseconds
    pub current_time: u64,
    pub speed: f64,
    pub active_requests: Vec<ActiveRequest>,
    pub node_metrics: BTreeMap<String, NodeMetrics>,
    pub edge_metrics: BTreeMap<String, EdgeMetrics>,
    pub system_metrics: SystemMetrics,
    pub events: Vec<SimulationEvent>,
    pub metrics_history: Vec<MetricsSnapshot>,
}

impl SimulationState {
    /// Returns true if every generated request has resolved.
    pub fn is_quiescent(&self) -> bool {
        self.active_requests.is_empty()
            && self.system_metrics.successful_requests + self.system_metrics.failed_requests
                == self.system_metrics.total_requests
    }
}
