//! Shared builders for integration tests

use archsim_core::{Architecture, Edge, Node, NodeType, SimulationConfig};
use archsim_sim::{Simulation, SimulationStatus};

/// Architecture from `(id, type)` nodes and `(source, target)` edges.
pub fn architecture(nodes: &[(&str, NodeType)], edges: &[(&str, &str)]) -> Architecture {
    Architecture::new(
        nodes
            .iter()
            .map(|(id, node_type)| Node::new(*id, *node_type))
            .collect(),
        edges
            .iter()
            .map(|(source, target)| Edge::new(*source, *target))
            .collect(),
    )
}

/// Error-free, seeded configuration.
pub fn quiet_config(requests_per_second: f64, duration_secs: u64) -> SimulationConfig {
    SimulationConfig {
        requests_per_second,
        error_rate: 0.0,
        duration_secs,
        seed: Some(2024),
        ..Default::default()
    }
}

/// Ticks a started simulation until it leaves Running, calling `inspect` after every tick.
pub fn tick_until_done(simulation: &mut Simulation, mut inspect: impl FnMut(&Simulation)) {
    simulation.start();
    let budget = simulation.tick_budget();
    for _ in 0..budget {
        if simulation.status() != SimulationStatus::Running {
            break;
        }
        simulation.tick();
        inspect(simulation);
    }
}
