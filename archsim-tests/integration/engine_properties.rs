//! Invariants that must hold on every tick of arbitrary graphs and configs

use std::collections::HashSet;

use archsim_core::{Architecture, Edge, EventType, Node, NodeType, SimulationConfig};
use archsim_sim::Simulation;
use proptest::prelude::*;

use crate::common::tick_until_done;

fn arb_architecture() -> impl Strategy<Value = Architecture> {
    (2usize..8)
        .prop_flat_map(|n| {
            (
                proptest::collection::vec(0..NodeType::ALL.len(), n),
                proptest::collection::vec((0..n, 0..n), 0..n * 3),
            )
        })
        .prop_map(|(types, edges)| {
            let mut nodes: Vec<Node> = types
                .iter()
                .enumerate()
                .map(|(i, t)| Node::new(format!("n{i}"), NodeType::ALL[*t]))
                .collect();
            nodes[0].node_type = NodeType::Client;

            let edges = edges
                .into_iter()
                .map(|(s, t)| Edge::new(format!("n{s}"), format!("n{t}")))
                .collect();
            Architecture::new(nodes, edges)
        })
}

fn arb_config() -> impl Strategy<Value = SimulationConfig> {
    (
        0.0..400.0f64,
        0.0..0.5f64,
        any::<bool>(),
        any::<bool>(),
        any::<u64>(),
        1u64..4,
        prop_oneof![Just(50u64), Just(100u64), Just(250u64)],
        1u32..50,
    )
        .prop_map(
            |(rps, error_rate, auto_scaling, chaos_mode, seed, duration, tick, queue)| {
                SimulationConfig {
                    requests_per_second: rps,
                    error_rate,
                    auto_scaling,
                    chaos_mode,
                    seed: Some(seed),
                    duration_secs: duration,
                    tick_rate_ms: tick,
                    message_queue_depth: queue,
                    ..Default::default()
                }
            },
        )
}

fn check_tick(simulation: &Simulation, architecture: &Architecture) {
    let system = simulation.system_metrics();
    let active = simulation.active_requests();

    // Every generated request is exactly one of: succeeded, failed, in flight
    assert_eq!(
        system.successful_requests + system.failed_requests + active.len() as u64,
        system.total_requests
    );
    assert_eq!(system.active_requests, active.len());

    if system.total_requests > 0 {
        let expected = system.failed_requests as f64 / system.total_requests as f64;
        assert_eq!(system.error_rate, expected);
    } else {
        assert_eq!(system.error_rate, 0.0);
    }

    for request in active {
        assert!(architecture.node(&request.target_node_id).is_some());
        let distinct: HashSet<&String> = request.path.iter().collect();
        assert_eq!(distinct.len(), request.path.len(), "revisit in {:?}", request.path);
        assert!((0.0..=1.0).contains(&request.progress));
    }

    let mut queue_total = 0;
    for node in &architecture.nodes {
        let metrics = simulation.node_metrics(&node.id).expect("metrics per node");
        assert!((1..=10).contains(&metrics.instances));
        assert!((0.0..=1.0).contains(&metrics.cpu_utilization));
        queue_total += metrics.queue_depth;
    }
    assert_eq!(system.total_queue_depth, queue_total);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_invariants_hold_every_tick(
        architecture in arb_architecture(),
        config in arb_config(),
    ) {
        let mut simulation = Simulation::new(architecture.clone(), config);
        tick_until_done(&mut simulation, |sim| check_tick(sim, &architecture));

        let events = simulation.events().events();
        for pair in events.windows(2) {
            prop_assert_eq!(pair[1].id, pair[0].id + 1);
            prop_assert!(pair[1].timestamp >= pair[0].timestamp);
        }

        for completed in simulation.events().of_type(EventType::RequestCompleted) {
            let path = completed.source_path.as_ref().expect("completion carries path");
            let distinct: HashSet<&String> = path.iter().collect();
            prop_assert_eq!(distinct.len(), path.len());
            prop_assert!(completed.message.contains("completed"));
        }

        prop_assert_eq!(simulation.events().count(EventType::SimulationCompleted), 1);
    }

    #[test]
    fn test_same_seed_same_run(
        architecture in arb_architecture(),
        config in arb_config(),
    ) {
        let mut first = Simulation::new(architecture.clone(), config.clone());
        let mut second = Simulation::new(architecture, config);
        tick_until_done(&mut first, |_| {});
        tick_until_done(&mut second, |_| {});

        prop_assert_eq!(first.events().events(), second.events().events());
        prop_assert_eq!(first.system_metrics(), second.system_metrics());
    }
}
