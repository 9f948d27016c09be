//! Wall-clock pacing for a simulation, using an actor.
//!
//! The engine itself is synchronous. The scheduler moves it into a tokio task
//! that ticks it every `tick_rate_ms / speed` of real time while running and
//! serves lifecycle and state commands in between ticks. Hosts drive it
//! through a cloneable [`SimulationHandle`].

mod actor;
mod commands;
mod handle;

pub use actor::spawn_simulation;
pub use commands::SimulationCommand;
pub use handle::SimulationHandle;

#[cfg(test)]
mod tests;
