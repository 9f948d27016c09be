//! End-to-end runs over small, hand-built architectures

use archsim_core::{EventType, NodeType, Severity};
use archsim_sim::{BottleneckSeverity, Simulation, SimulationStatus, run_to_completion};

use crate::common::{architecture, quiet_config, tick_until_done};

#[test]
fn test_zero_rate_produces_no_traffic_and_no_bottlenecks() {
    let graph = architecture(
        &[
            ("client", NodeType::Client),
            ("lb", NodeType::LoadBalancer),
            ("svc", NodeType::Service),
            ("cache", NodeType::Cache),
            ("db", NodeType::Database),
        ],
        &[
            ("client", "lb"),
            ("lb", "svc"),
            ("svc", "cache"),
            ("cache", "db"),
        ],
    );

    for duration in [1, 7] {
        let mut simulation = Simulation::new(graph.clone(), quiet_config(0.0, duration));
        let result = run_to_completion(&mut simulation);

        assert_eq!(result.summary.total_requests, 0);
        assert!(result.summary.bottlenecks.is_empty());
        assert_eq!(result.summary.recommendations.len(), 1);
        assert!(result.summary.recommendations[0].contains("No bottlenecks"));
        assert_eq!(simulation.events().count(EventType::RequestSent), 0);
    }
}

#[test]
fn test_client_to_database_latency_rounds_up_to_one_tick() {
    let mut config = quiet_config(50.0, 1);
    config.db_latency_ms = 40.0;
    config.tick_rate_ms = 100;
    let mut simulation = Simulation::new(
        architecture(
            &[("client", NodeType::Client), ("db", NodeType::Database)],
            &[("client", "db")],
        ),
        config,
    );

    let result = run_to_completion(&mut simulation);

    let summary = &result.summary;
    assert!(summary.total_requests > 0);
    assert_eq!(summary.successful_requests, summary.total_requests);
    assert_eq!(summary.failed_requests, 0);
    assert_eq!(summary.average_latency, 100.0);
    for event in result
        .events
        .iter()
        .filter(|event| event.event_type == EventType::RequestCompleted)
    {
        assert_eq!(
            event.source_path.as_deref(),
            Some(&["client".to_string(), "db".to_string()][..])
        );
    }
}

#[test]
fn test_stop_then_result_twice_is_identical() {
    let mut config = quiet_config(80.0, 30);
    config.error_rate = 0.05;
    let mut simulation = Simulation::new(
        architecture(
            &[
                ("client", NodeType::Client),
                ("svc", NodeType::Service),
                ("db", NodeType::Database),
            ],
            &[("client", "svc"), ("svc", "db")],
        ),
        config,
    );

    simulation.start();
    for _ in 0..25 {
        simulation.tick();
    }
    simulation.stop();

    let first = simulation.result();
    let second = simulation.result();
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.events.len(), second.events.len());
    assert_eq!(simulation.events().count(EventType::SimulationStopped), 1);
    assert_eq!(simulation.events().count(EventType::SimulationCompleted), 0);

    // No tick runs once stopped
    let time = simulation.current_time();
    simulation.tick();
    assert_eq!(simulation.current_time(), time);
}

#[test]
fn test_two_node_cycle_terminates_every_request() {
    let mut simulation = Simulation::new(
        architecture(
            &[
                ("client", NodeType::Client),
                ("a", NodeType::Service),
                ("b", NodeType::Service),
            ],
            &[("client", "a"), ("a", "b"), ("b", "a")],
        ),
        quiet_config(40.0, 3),
    );

    let mut max_path = 0;
    tick_until_done(&mut simulation, |sim| {
        for request in sim.active_requests() {
            max_path = max_path.max(request.path.len());
        }
    });

    // client, a, b is the longest possible traversal
    assert!(max_path <= 3);
    let system = simulation.system_metrics();
    assert_eq!(system.failed_requests, 0);
    assert_eq!(
        system.successful_requests + system.active_requests as u64,
        system.total_requests
    );
}

#[test]
fn test_sustained_load_scales_service_to_cap() {
    let mut config = quiet_config(1500.0, 3);
    config.auto_scaling = true;
    let mut simulation = Simulation::new(
        architecture(
            &[("client", NodeType::Client), ("svc", NodeType::Service)],
            &[("client", "svc")],
        ),
        config,
    );

    let mut observed = Vec::new();
    tick_until_done(&mut simulation, |sim| {
        observed.push(sim.node_metrics("svc").map_or(0, |m| m.instances));
    });

    // Strictly increasing until the cap, then flat
    let cap_at = observed
        .iter()
        .position(|&instances| instances == 10)
        .expect("service reaches 10 instances");
    for pair in observed[..=cap_at].windows(2) {
        assert_eq!(pair[1], pair[0] + 1);
    }
    assert!(observed[cap_at..].iter().all(|&instances| instances == 10));
}

#[test]
fn test_cache_hit_does_not_shorten_route() {
    // Known limitation: a hit still continues to the backing store
    let mut config = quiet_config(30.0, 2);
    config.cache_hit_ratio = 1.0;
    let mut simulation = Simulation::new(
        architecture(
            &[
                ("client", NodeType::Client),
                ("cache", NodeType::Cache),
                ("db", NodeType::Database),
            ],
            &[("client", "cache"), ("cache", "db")],
        ),
        config,
    );
    run_to_completion(&mut simulation);

    let log = simulation.events();
    assert!(log.count(EventType::CacheHit) > 0);
    assert_eq!(log.count(EventType::CacheMiss), 0);
    assert!(log.count(EventType::DbQuery) > 0);
    for completed in log.of_type(EventType::RequestCompleted) {
        assert_eq!(completed.node_id.as_deref(), Some("db"));
    }
    assert_eq!(simulation.node_metrics("cache").unwrap().cache_hit_rate, Some(1.0));
}

#[test]
fn test_saturated_queue_is_reported_as_bottleneck() {
    let mut config = quiet_config(200.0, 2);
    config.message_queue_depth = 10;
    let mut simulation = Simulation::new(
        architecture(
            &[
                ("client", NodeType::Client),
                ("queue", NodeType::Queue),
                ("svc", NodeType::Service),
            ],
            &[("client", "queue"), ("queue", "svc")],
        ),
        config,
    );
    let result = run_to_completion(&mut simulation);

    let log = simulation.events();
    assert!(log.count(EventType::BacklogWarning) > 0);
    assert!(
        log.of_type(EventType::BacklogWarning)
            .all(|event| event.severity == Severity::Warning)
    );

    let queue = result
        .summary
        .bottlenecks
        .iter()
        .find(|b| b.node_id == "queue")
        .expect("queue flagged");
    assert!(queue.severity >= BottleneckSeverity::High);
}

#[test]
fn test_graph_without_clients_runs_quietly() {
    let mut simulation = Simulation::new(
        architecture(
            &[("svc", NodeType::Service), ("db", NodeType::Database)],
            &[("svc", "db")],
        ),
        quiet_config(500.0, 2),
    );
    let result = run_to_completion(&mut simulation);

    assert_eq!(result.status, SimulationStatus::Completed);
    assert_eq!(result.summary.total_requests, 0);
    assert_eq!(simulation.events().count(EventType::RequestSent), 0);
}
