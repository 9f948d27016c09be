//! Command definitions for the simulation actor.

use tokio::sync::oneshot;

use crate::analysis::SimulationResult;
use crate::engine::SimulationState;
use crate::lifecycle::SimulationStatus;

/// Commands that can be sent to the simulation actor.
///
/// Each command carries a response channel. Lifecycle commands answer with
/// the status after the command was applied.
#[derive(Debug)]
pub enum SimulationCommand {
    Start {
        responder: oneshot::Sender<SimulationStatus>,
    },
    Pause {
        responder: oneshot::Sender<SimulationStatus>,
    },
    Resume {
        responder: oneshot::Sender<SimulationStatus>,
    },
    Stop {
        responder: oneshot::Sender<SimulationStatus>,
    },
    /// Change the wall-clock multiplier; invalid values are ignored.
    SetSpeed {
        speed: f64,
        responder: oneshot::Sender<f64>,
    },
    Reset {
        responder: oneshot::Sender<SimulationStatus>,
    },
    GetState {
        responder: oneshot::Sender<SimulationState>,
    },
    GetResult {
        responder: oneshot::Sender<SimulationResult>,
    },
    /// Stop the actor loop. The engine is dropped afterwards.
    Shutdown { responder: oneshot::Sender<()> },
}
