//! Node-type service times and arrival side effects.

use archsim_core::{
    EventDraft, EventType, NodeMetrics, NodeType, Severity, SimulationConfig,
};

use crate::rng::DeterministicRng;

/// Fixed service time of cache nodes.
pub const CACHE_LATENCY_MS: f64 = 2.0;

/// Fixed service time of queue nodes.
pub const QUEUE_LATENCY_MS: f64 = 5.0;

/// Service time of node types without a dedicated cost.
pub const DEFAULT_PROCESSING_LATENCY_MS: f64 = 5.0;

/// Queue fill fraction above which backlog warnings fire.
pub const BACKLOG_THRESHOLD: f64 = 0.8;

/// Service time charged at a node of `node_type`.
pub fn processing_latency(node_type: NodeType, config: &SimulationConfig) -> f64 {
    match node_type {
        NodeType::Database => config.db_latency_ms,
        NodeType::Cache => CACHE_LATENCY_MS,
        NodeType::Queue => QUEUE_LATENCY_MS,
        NodeType::Service => config.service_cpu_cost_ms,
        NodeType::Client
        | NodeType::ApiGateway
        | NodeType::LoadBalancer
        | NodeType::Pubsub
        | NodeType::ObjectStorage
        | NodeType::Metrics
        | NodeType::RateLimiter
        | NodeType::Cdn => DEFAULT_PROCESSING_LATENCY_MS,
    }
}

/// Total cost of the hop `from -> to`: network plus service time at `to`.
pub fn hop_latency(from: NodeType, to: NodeType, config: &SimulationConfig) -> f64 {
    config.network_latency.latency(from, to) + processing_latency(to, config)
}

/// Applies the effects of a request successfully arriving at a node.
///
/// Updates the node's metrics at simulated time `now_ms` and returns the
/// events the arrival produces.
pub fn process_arrival(
    node_id: &str,
    node_type: NodeType,
    request_id: &str,
    metrics: &mut NodeMetrics,
    config: &SimulationConfig,
    rng: &mut DeterministicRng,
    now_ms: u64,
) -> Vec<EventDraft> {
    let mut events = Vec::new();

    match node_type {
        NodeType::Cache => {
            // Informational only: a hit does not shorten the remaining route
            let hit = rng.random_bool(config.cache_hit_ratio);
            metrics.record_cache_lookup(hit);
            events.push(if hit {
                EventDraft::new(
                    EventType::CacheHit,
                    Severity::Success,
                    format!("Cache hit at {node_id} for {request_id}"),
                )
            } else {
                EventDraft::new(
                    EventType::CacheMiss,
                    Severity::Info,
                    format!("Cache miss at {node_id} for {request_id}"),
                )
            });
        }
        NodeType::Database => {
            metrics.record_query();
            events.push(EventDraft::new(
                EventType::DbQuery,
                Severity::Info,
                format!("Query executed at {node_id} for {request_id}"),
            ));
        }
        NodeType::Queue => {
            metrics.queue_depth += 1;
            events.push(
                EventDraft::new(
                    EventType::QueueEnqueue,
                    Severity::Info,
                    format!("Message enqueued at {node_id} (depth {})", metrics.queue_depth),
                )
                .meta("queue_depth", metrics.queue_depth),
            );

            let limit = f64::from(config.message_queue_depth) * BACKLOG_THRESHOLD;
            if metrics.queue_depth as f64 > limit {
                events.push(
                    EventDraft::new(
                        EventType::BacklogWarning,
                        Severity::Warning,
                        format!(
                            "Queue {node_id} backlog at {} of {} messages",
                            metrics.queue_depth, config.message_queue_depth
                        ),
                    )
                    .meta("queue_depth", metrics.queue_depth)
                    .meta("capacity", config.message_queue_depth),
                );
            }
        }
        NodeType::Client
        | NodeType::ApiGateway
        | NodeType::LoadBalancer
        | NodeType::Service
        | NodeType::Pubsub
        | NodeType::ObjectStorage
        | NodeType::Metrics
        | NodeType::RateLimiter
        | NodeType::Cdn => {}
    }

    metrics.refresh_load(now_ms);

    events.into_iter().map(|event| event.node(node_id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_latency_by_type() {
        let config = SimulationConfig {
            db_latency_ms: 40.0,
            service_cpu_cost_ms: 12.0,
            ..Default::default()
        };

        assert_eq!(processing_latency(NodeType::Database, &config), 40.0);
        assert_eq!(processing_latency(NodeType::Service, &config), 12.0);
        assert_eq!(processing_latency(NodeType::Cache, &config), 2.0);
        assert_eq!(processing_latency(NodeType::Queue, &config), 5.0);
        assert_eq!(processing_latency(NodeType::Cdn, &config), 5.0);
    }

    #[test]
    fn test_hop_latency_uses_fallback_network_latency() {
        let config = SimulationConfig {
            db_latency_ms: 40.0,
            ..Default::default()
        };
        assert_eq!(hop_latency(NodeType::Client, NodeType::Database, &config), 50.0);
    }

    #[test]
    fn test_database_arrival_counts_query() {
        let config = SimulationConfig::default();
        let mut rng = DeterministicRng::from_seed(1);
        let mut metrics = NodeMetrics::new(NodeType::Database);

        let events = process_arrival("db", NodeType::Database, "req-1", &mut metrics, &config, &mut rng, 100);
        assert_eq!(metrics.query_rate, Some(1));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_queue_backlog_warning_above_threshold() {
        let config = SimulationConfig {
            message_queue_depth: 10,
            ..Default::default()
        };
        let mut rng = DeterministicRng::from_seed(1);
        let mut metrics = NodeMetrics::new(NodeType::Queue);

        let mut warnings = 0;
        for _ in 0..10 {
            let events =
                process_arrival("q", NodeType::Queue, "req", &mut metrics, &config, &mut rng, 100);
            warnings += events.len() - 1;
        }

        // Depths 9 and 10 exceed 8
        assert_eq!(metrics.queue_depth, 10);
        assert_eq!(warnings, 2);
    }

    #[test]
    fn test_cache_hit_ratio_extremes() {
        let mut rng = DeterministicRng::from_seed(1);
        let mut metrics = NodeMetrics::new(NodeType::Cache);

        let always = SimulationConfig {
            cache_hit_ratio: 1.0,
            ..Default::default()
        };
        for _ in 0..5 {
            process_arrival("c", NodeType::Cache, "r", &mut metrics, &always, &mut rng, 100);
        }
        assert_eq!(metrics.cache_hit_rate, Some(1.0));

        let never = SimulationConfig {
            cache_hit_ratio: 0.0,
            ..Default::default()
        };
        for _ in 0..5 {
            process_arrival("c", NodeType::Cache, "r", &mut metrics, &never, &mut rng, 100);
        }
        assert_eq!(metrics.cache_hit_rate, Some(0.5));
    }

    #[test]
    fn test_arrival_refreshes_cpu() {
        let config = SimulationConfig::default();
        let mut rng = DeterministicRng::from_seed(1);
        let mut metrics = NodeMetrics::new(NodeType::Service);
        for _ in 0..80 {
            metrics.record_success(1.0);
        }

        process_arrival("svc", NodeType::Service, "r", &mut metrics, &config, &mut rng, 1000);
        assert!((metrics.cpu_utilization - 0.8).abs() < 1e-9);
    }
}
