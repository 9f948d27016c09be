//! Archsim Simulation Engine - Tick-driven traffic simulation over architecture graphs.
//!
//! This crate turns an [`Architecture`](archsim_core::Architecture) and a
//! [`SimulationConfig`](archsim_core::SimulationConfig) into a stream of
//! events and metrics by advancing simulated time in fixed ticks.
//!
//! # Features
//!
//! - **Deterministic Execution**: A seeded ChaCha generator drives every random decision
//! - **Per-Hop Latency Model**: Network plus node-type service time, quantized to ticks
//! - **Auto-Scaling**: Threshold controller for SERVICE nodes
//! - **Bottleneck Analysis**: Severity-ranked findings and recommendations after a run
//! - **Actor Scheduler**: Wall-clock pacing with an async command handle
//!
//! # Example
//!
//! ```rust,no_run
//! use archsim_core::{Architecture, SimulationConfig};
//! use archsim_sim::{Simulation, run_to_completion};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let architecture = Architecture::load("demos/web-app.json".as_ref())?;
//! let mut simulation = Simulation::new(architecture, SimulationConfig::deterministic_testing());
//!
//! let result = run_to_completion(&mut simulation);
//! for bottleneck in &result.summary.bottlenecks {
//!     println!("{}: {:?}", bottleneck.node_label, bottleneck.severity);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod engine;
pub mod lifecycle;
pub mod observers;
pub mod processing;
pub mod request;
pub mod rng;
pub mod routing;
pub mod runner;
pub mod scaling;
pub mod scheduler;
pub mod topology;

use archsim_core::{ArchitectureError, ConfigError};
// Re-export main types for convenient access
pub use analysis::{BottleneckAnalysis, BottleneckSeverity, SimulationResult, SimulationSummary};
pub use engine::{Simulation, SimulationState};
pub use lifecycle::SimulationStatus;
pub use observers::{Observers, Subscription};
pub use request::{ActiveRequest, RequestStatus};
pub use rng::DeterministicRng;
pub use routing::{FirstUnvisited, RoutingStrategy};
pub use runner::{Comparison, ComparisonDelta, compare, run_to_completion, simulate};
pub use scheduler::{SimulationHandle, spawn_simulation};
pub use topology::Topology;

/// Errors surfaced by simulation hosts.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Simulation engine has shut down")]
    EngineShutdown,

    #[error("Invalid architecture: {0}")]
    Architecture(#[from] ArchitectureError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
