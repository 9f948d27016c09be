//! Per-node, per-edge and system-wide metrics plus periodic snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::architecture::NodeType;

/// Running metrics for a single node.
///
/// Created once per node when the engine is built and mutated every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    /// Completed hops per simulated second
    pub requests_per_second: f64,
    /// Mean hop latency at this node in milliseconds
    pub average_latency: f64,
    pub success_rate: f64,
    pub error_rate: f64,
    pub queue_depth: u64,
    /// Utilization in [0, 1]
    pub cpu_utilization: f64,
    /// Provisioned instances, never below 1
    pub instances: u32,
    /// Successful hops handled (monotonic)
    pub throughput: u64,
    /// Failed hops at this node (monotonic)
    pub failures: u64,
    /// Hit fraction, cache nodes only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_hit_rate: Option<f64>,
    /// Queries served, database nodes only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_rate: Option<u64>,
    #[serde(skip)]
    cache_hits: u64,
    #[serde(skip)]
    cache_lookups: u64,
}

impl NodeMetrics {
    /// Creates zeroed metrics shaped for the node type.
    pub fn new(node_type: NodeType) -> Self {
        Self {
            requests_per_second: 0.0,
            average_latency: 0.0,
            success_rate: 1.0,
            error_rate: 0.0,
            queue_depth: 0,
            cpu_utilization: 0.0,
            instances: 1,
            throughput: 0,
            failures: 0,
            cache_hit_rate: (node_type == NodeType::Cache).then_some(0.0),
            query_rate: (node_type == NodeType::Database).then_some(0),
            cache_hits: 0,
            cache_lookups: 0,
        }
    }

    /// Total hops that resolved at this node, successful or not.
    pub fn handled(&self) -> u64 {
        self.throughput + self.failures
    }

    /// Records a successful hop of `latency_ms`.
    pub fn record_success(&mut self, latency_ms: f64) {
        self.throughput += 1;
        self.average_latency = running_mean(self.average_latency, latency_ms, self.throughput);
        self.refresh_rates();
    }

    /// Records a failed hop.
    pub fn record_failure(&mut self) {
        self.failures += 1;
        self.refresh_rates();
    }

    /// Records a cache lookup outcome.
    pub fn record_cache_lookup(&mut self, hit: bool) {
        self.cache_lookups += 1;
        if hit {
            self.cache_hits += 1;
        }
        self.cache_hit_rate = Some(self.cache_hits as f64 / self.cache_lookups as f64);
    }

    /// Records a query served by a database node.
    pub fn record_query(&mut self) {
        *self.query_rate.get_or_insert(0) += 1;
    }

    /// Recomputes load figures from throughput at simulated time `now_ms`.
    ///
    /// Each instance is assumed to absorb 100 requests per second.
    pub fn refresh_load(&mut self, now_ms: u64) {
        if now_ms > 0 {
            self.requests_per_second = self.throughput as f64 / (now_ms as f64 / 1000.0);
        }
        self.cpu_utilization =
            ((self.requests_per_second / 100.0) * f64::from(self.instances)).min(1.0);
    }

    fn refresh_rates(&mut self) {
        let handled = self.handled();
        if handled > 0 {
            self.error_rate = self.failures as f64 / handled as f64;
            self.success_rate = 1.0 - self.error_rate;
        }
    }
}

/// Traffic along a single directed edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeMetrics {
    /// Hops that arrived along this edge
    pub requests: u64,
    /// Hops along this edge that failed at the target
    pub failures: u64,
    /// Mean hop latency in milliseconds
    pub average_latency: f64,
}

impl EdgeMetrics {
    /// Records a hop along the edge.
    pub fn record_hop(&mut self, latency_ms: f64, failed: bool) {
        self.requests += 1;
        if failed {
            self.failures += 1;
        }
        self.average_latency = running_mean(self.average_latency, latency_ms, self.requests);
    }
}

/// System-wide aggregates, recomputed every tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// Simulated time in milliseconds
    pub timestamp: u64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Running mean end-to-end latency of completed requests
    pub average_latency: f64,
    pub requests_per_second: f64,
    pub error_rate: f64,
    pub total_queue_depth: u64,
    pub active_requests: usize,
    pub scaling_actions: u64,
}

impl SystemMetrics {
    /// Records a successfully completed request.
    pub fn record_completion(&mut self, latency_ms: f64) {
        self.successful_requests += 1;
        self.average_latency =
            running_mean(self.average_latency, latency_ms, self.successful_requests);
    }

    /// Recomputes derived rates at simulated time `now_ms`.
    pub fn refresh_rates(&mut self, now_ms: u64) {
        self.timestamp = now_ms;
        self.requests_per_second = if now_ms > 0 {
            self.total_requests as f64 / (now_ms as f64 / 1000.0)
        } else {
            0.0
        };
        self.error_rate = if self.total_requests > 0 {
            self.failed_requests as f64 / self.total_requests as f64
        } else {
            0.0
        };
    }

    /// Fraction of generated requests that completed successfully.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.successful_requests as f64 / self.total_requests as f64
    }
}

/// Immutable copy of aggregate metrics at one simulated second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: u64,
    pub system: SystemMetrics,
    pub nodes: BTreeMap<String, NodeMetrics>,
    pub edges: BTreeMap<String, EdgeMetrics>,
}

/// Incremental mean after adding `sample` as the `count`-th observation.
pub fn running_mean(previous: f64, sample: f64, count: u64) -> f64 {
    if count == 0 {
        return previous;
    }
    let n = count as f64;
    (previous * (n - 1.0) + sample) / n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_mean() {
        let mut mean = 0.0;
        for (i, sample) in [10.0, 20.0, 30.0].into_iter().enumerate() {
            mean = running_mean(mean, sample, i as u64 + 1);
        }
        assert!((mean - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_node_metrics_shape_by_type() {
        assert_eq!(NodeMetrics::new(NodeType::Cache).cache_hit_rate, Some(0.0));
        assert_eq!(NodeMetrics::new(NodeType::Cache).query_rate, None);
        assert_eq!(NodeMetrics::new(NodeType::Database).query_rate, Some(0));
        assert_eq!(NodeMetrics::new(NodeType::Service).instances, 1);
    }

    #[test]
    fn test_node_error_rate_tracks_failures() {
        let mut metrics = NodeMetrics::new(NodeType::Service);
        metrics.record_success(10.0);
        metrics.record_success(20.0);
        metrics.record_success(30.0);
        metrics.record_failure();

        assert_eq!(metrics.handled(), 4);
        assert!((metrics.error_rate - 0.25).abs() < 1e-9);
        assert!((metrics.success_rate - 0.75).abs() < 1e-9);
        assert!((metrics.average_latency - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_cpu_scales_with_rps_and_instances() {
        let mut metrics = NodeMetrics::new(NodeType::Service);
        for _ in 0..50 {
            metrics.record_success(1.0);
        }
        metrics.refresh_load(1000);
        assert!((metrics.requests_per_second - 50.0).abs() < 1e-9);
        assert!((metrics.cpu_utilization - 0.5).abs() < 1e-9);

        metrics.instances = 3;
        metrics.refresh_load(1000);
        assert_eq!(metrics.cpu_utilization, 1.0);
    }

    #[test]
    fn test_cache_hit_rate() {
        let mut metrics = NodeMetrics::new(NodeType::Cache);
        metrics.record_cache_lookup(true);
        metrics.record_cache_lookup(false);
        metrics.record_cache_lookup(true);
        metrics.record_cache_lookup(true);
        assert_eq!(metrics.cache_hit_rate, Some(0.75));
    }

    #[test]
    fn test_system_error_rate_guarded() {
        let mut system = SystemMetrics::default();
        system.refresh_rates(0);
        assert_eq!(system.error_rate, 0.0);
        assert_eq!(system.requests_per_second, 0.0);

        system.total_requests = 10;
        system.failed_requests = 2;
        system.refresh_rates(2000);
        assert!((system.error_rate - 0.2).abs() < 1e-9);
        assert!((system.requests_per_second - 5.0).abs() < 1e-9);
    }

    proptest::proptest! {
        #[test]
        fn test_running_mean_matches_arithmetic_mean(
            samples in proptest::collection::vec(0.0..10_000.0f64, 1..200),
        ) {
            let mut mean = 0.0;
            for (i, sample) in samples.iter().enumerate() {
                mean = running_mean(mean, *sample, i as u64 + 1);
            }
            let expected = samples.iter().sum::<f64>() / samples.len() as f64;
            proptest::prop_assert!((mean - expected).abs() < 1e-6 * expected.max(1.0));
        }
    }
}
