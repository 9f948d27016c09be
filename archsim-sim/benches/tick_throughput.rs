use std::hint::black_box;

use archsim_core::{Architecture, Edge, Node, NodeType, SimulationConfig};
use archsim_sim::{Simulation, run_to_completion};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

fn layered_architecture() -> Architecture {
    Architecture::new(
        vec![
            Node::new("client", NodeType::Client),
            Node::new("gateway", NodeType::ApiGateway),
            Node::new("lb", NodeType::LoadBalancer),
            Node::new("orders", NodeType::Service),
            Node::new("cache", NodeType::Cache),
            Node::new("db", NodeType::Database),
            Node::new("events", NodeType::Queue),
            Node::new("worker", NodeType::Service),
        ],
        vec![
            Edge::new("client", "gateway"),
            Edge::new("gateway", "lb"),
            Edge::new("lb", "orders"),
            Edge::new("orders", "cache"),
            Edge::new("cache", "db"),
            Edge::new("orders", "events"),
            Edge::new("events", "worker"),
        ],
    )
}

fn bench_headless_run(c: &mut Criterion) {
    let config = SimulationConfig {
        requests_per_second: 1000.0,
        duration_secs: 10,
        auto_scaling: true,
        seed: Some(1),
        ..Default::default()
    };

    c.bench_function("headless_run_1000_rps_10s", |b| {
        b.iter(|| {
            let mut simulation = Simulation::new(layered_architecture(), config.clone());
            black_box(run_to_completion(&mut simulation))
        });
    });
}

fn bench_single_tick(c: &mut Criterion) {
    let config = SimulationConfig {
        requests_per_second: 5000.0,
        seed: Some(1),
        ..Default::default()
    };

    // Measure one tick against a pipeline that already has traffic in flight
    c.bench_function("tick_5000_rps", |b| {
        b.iter_batched(
            || {
                let mut simulation = Simulation::new(layered_architecture(), config.clone());
                simulation.start();
                for _ in 0..10 {
                    simulation.tick();
                }
                simulation
            },
            |mut simulation| {
                simulation.tick();
                simulation
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_headless_run, bench_single_tick);
criterion_main!(benches);
