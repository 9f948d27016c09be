//! Post-run bottleneck detection and result synthesis.

use archsim_core::{
    MetricsSnapshot, NodeMetrics, NodeType, SimulationConfig, SimulationEvent, SystemMetrics,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lifecycle::SimulationStatus;
use crate::topology::Topology;

const CRITICAL_ERROR_RATE: f64 = 0.1;
const CRITICAL_CPU: f64 = 0.9;
const ELEVATED_CPU: f64 = 0.7;
const QUEUE_SATURATION: f64 = 0.8;

/// Seriousness of a detected bottleneck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BottleneckSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BottleneckSeverity {
    /// Sort rank: critical 4, high 3, medium 2, low 1.
    pub fn rank(self) -> u8 {
        match self {
            BottleneckSeverity::Low => 1,
            BottleneckSeverity::Medium => 2,
            BottleneckSeverity::High => 3,
            BottleneckSeverity::Critical => 4,
        }
    }
}

/// A node flagged as a performance or reliability risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckAnalysis {
    pub node_id: String,
    pub node_label: String,
    pub node_type: NodeType,
    pub severity: BottleneckSeverity,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Headline figures for a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Fraction of generated requests that completed
    pub success_rate: f64,
    pub average_latency: f64,
    /// Highest system request rate across snapshots
    pub peak_rps: f64,
    pub total_scaling_actions: u64,
    pub bottlenecks: Vec<BottleneckAnalysis>,
    pub recommendations: Vec<String>,
}

/// Everything a host needs to report on a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub run_id: Uuid,
    pub seed: u64,
    pub status: SimulationStatus,
    pub finished_at: DateTime<Utc>,
    pub config: SimulationConfig,
    /// Simulated seconds elapsed
    pub duration: f64,
    pub metrics_history: Vec<MetricsSnapshot>,
    pub events: Vec<SimulationEvent>,
    pub summary: SimulationSummary,
}

/// Classifies every node and returns the flagged ones, most severe first.
///
/// Ties keep node declaration order.
pub fn detect_bottlenecks<'a>(
    topology: &Topology,
    node_metrics: impl Fn(&str) -> Option<&'a NodeMetrics>,
    config: &SimulationConfig,
) -> Vec<BottleneckAnalysis> {
    let queue_limit = f64::from(config.message_queue_depth) * QUEUE_SATURATION;

    let mut bottlenecks: Vec<BottleneckAnalysis> = topology
        .nodes()
        .iter()
        .filter_map(|node| {
            let metrics = node_metrics(&node.id)?;
            let mut severity = BottleneckSeverity::Low;
            let mut issues = Vec::new();
            let mut recommendations = Vec::new();

            if metrics.error_rate > CRITICAL_ERROR_RATE {
                severity = BottleneckSeverity::Critical;
                issues.push(format!(
                    "High error rate: {:.1}%",
                    metrics.error_rate * 100.0
                ));
                recommendations
                    .push("Add retries with backoff and a circuit breaker upstream".to_string());
            }

            if metrics.cpu_utilization > CRITICAL_CPU {
                severity = BottleneckSeverity::Critical;
                issues.push(format!(
                    "CPU saturated at {:.0}%",
                    metrics.cpu_utilization * 100.0
                ));
                recommendations.push(format!(
                    "Scale {} horizontally beyond {} instance(s)",
                    node.label, metrics.instances
                ));
            } else if metrics.cpu_utilization > ELEVATED_CPU {
                severity = severity.max(BottleneckSeverity::Medium);
                issues.push(format!(
                    "Elevated CPU utilization at {:.0}%",
                    metrics.cpu_utilization * 100.0
                ));
                recommendations.push("Enable auto-scaling or add capacity headroom".to_string());
            }

            if metrics.queue_depth as f64 > queue_limit {
                severity = severity.max(BottleneckSeverity::High);
                issues.push(format!(
                    "Queue backlog of {} messages (capacity {})",
                    metrics.queue_depth, config.message_queue_depth
                ));
                recommendations.push("Add consumers or partition the queue".to_string());
            }

            (!issues.is_empty()).then(|| BottleneckAnalysis {
                node_id: node.id.clone(),
                node_label: node.label.clone(),
                node_type: node.node_type,
                severity,
                issues,
                recommendations,
            })
        })
        .collect();

    // Stable sort keeps declaration order within a severity
    bottlenecks.sort_by(|a, b| b.severity.rank().cmp(&a.severity.rank()));
    bottlenecks
}

/// Architecture-wide advice derived from bottlenecks and topology.
pub fn global_recommendations(
    topology: &Topology,
    bottlenecks: &[BottleneckAnalysis],
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if bottlenecks.is_empty() {
        recommendations
            .push("No bottlenecks detected: the architecture handled the load well".to_string());
    }

    if bottlenecks
        .iter()
        .any(|b| b.severity == BottleneckSeverity::Critical)
    {
        recommendations.push(
            "URGENT: critical bottlenecks detected, address them before scaling traffic"
                .to_string(),
        );
    }

    if !topology.has_node_type(NodeType::Cache) {
        recommendations
            .push("Consider adding a cache layer to reduce database load and latency".to_string());
    }

    if !topology.has_node_type(NodeType::LoadBalancer) {
        recommendations.push(
            "Consider adding a load balancer to distribute traffic across service instances"
                .to_string(),
        );
    }

    recommendations
}

/// Highest system request rate recorded in the history.
pub fn peak_rps(history: &[MetricsSnapshot]) -> f64 {
    history
        .iter()
        .map(|snapshot| snapshot.system.requests_per_second)
        .fold(0.0, f64::max)
}

/// Builds the summary for the final system metrics.
pub fn summarize(
    system: &SystemMetrics,
    history: &[MetricsSnapshot],
    bottlenecks: Vec<BottleneckAnalysis>,
    recommendations: Vec<String>,
) -> SimulationSummary {
    SimulationSummary {
        total_requests: system.total_requests,
        successful_requests: system.successful_requests,
        failed_requests: system.failed_requests,
        success_rate: system.success_rate(),
        average_latency: system.average_latency,
        peak_rps: peak_rps(history),
        total_scaling_actions: system.scaling_actions,
        bottlenecks,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use archsim_core::{Architecture, Node};

    use super::*;

    fn topology(types: &[(&str, NodeType)]) -> Topology {
        Topology::new(Architecture::new(
            types
                .iter()
                .map(|(id, node_type)| Node::new(*id, *node_type))
                .collect(),
            Vec::new(),
        ))
    }

    #[test]
    fn test_severity_precedence_and_order() {
        let topology = topology(&[
            ("warm", NodeType::Service),
            ("queue", NodeType::Queue),
            ("broken", NodeType::Service),
            ("idle", NodeType::Database),
        ]);
        let config = SimulationConfig {
            message_queue_depth: 100,
            ..Default::default()
        };

        let mut metrics: HashMap<String, NodeMetrics> = topology
            .nodes()
            .iter()
            .map(|n| (n.id.clone(), NodeMetrics::new(n.node_type)))
            .collect();
        metrics.get_mut("warm").unwrap().cpu_utilization = 0.75;
        metrics.get_mut("queue").unwrap().queue_depth = 90;
        let broken = metrics.get_mut("broken").unwrap();
        broken.error_rate = 0.5;
        broken.cpu_utilization = 0.8;

        let found = detect_bottlenecks(&topology, |id| metrics.get(id), &config);
        let order: Vec<(&str, BottleneckSeverity)> = found
            .iter()
            .map(|b| (b.node_id.as_str(), b.severity))
            .collect();

        assert_eq!(
            order,
            vec![
                ("broken", BottleneckSeverity::Critical),
                ("queue", BottleneckSeverity::High),
                ("warm", BottleneckSeverity::Medium),
            ]
        );
        // Critical error rate is not downgraded by the medium CPU rule
        assert_eq!(found[0].issues.len(), 2);
    }

    #[test]
    fn test_ties_keep_declaration_order() {
        let topology = topology(&[("b", NodeType::Service), ("a", NodeType::Service)]);
        let mut metrics = HashMap::new();
        for id in ["b", "a"] {
            let mut m = NodeMetrics::new(NodeType::Service);
            m.cpu_utilization = 0.95;
            metrics.insert(id.to_string(), m);
        }

        let found = detect_bottlenecks(&topology, |id| metrics.get(id), &SimulationConfig::default());
        assert_eq!(found[0].node_id, "b");
        assert_eq!(found[1].node_id, "a");
    }

    #[test]
    fn test_global_recommendations() {
        let bare = topology(&[("svc", NodeType::Service)]);
        let recs = global_recommendations(&bare, &[]);
        assert_eq!(recs.len(), 3);
        assert!(recs[0].contains("No bottlenecks"));

        let complete = topology(&[
            ("lb", NodeType::LoadBalancer),
            ("cache", NodeType::Cache),
        ]);
        let critical = BottleneckAnalysis {
            node_id: "lb".into(),
            node_label: "lb".into(),
            node_type: NodeType::LoadBalancer,
            severity: BottleneckSeverity::Critical,
            issues: vec!["x".into()],
            recommendations: Vec::new(),
        };
        let recs = global_recommendations(&complete, &[critical]);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].starts_with("URGENT"));
    }

    #[test]
    fn test_peak_rps_over_history() {
        let snapshot = |rps: f64| MetricsSnapshot {
            timestamp: 0,
            system: SystemMetrics {
                requests_per_second: rps,
                ..Default::default()
            },
            nodes: Default::default(),
            edges: Default::default(),
        };
        assert_eq!(peak_rps(&[]), 0.0);
        assert_eq!(peak_rps(&[snapshot(3.0), snapshot(9.5), snapshot(4.0)]), 9.5);
    }
}
