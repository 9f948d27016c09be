//! Actor implementation for the simulation scheduler.

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use super::commands::SimulationCommand;
use super::handle::SimulationHandle;
use crate::engine::Simulation;
use crate::lifecycle::SimulationStatus;

/// Spawns the simulation actor and returns its handle.
///
/// Must be called from within a tokio runtime. The simulation stays idle
/// until `start` is sent.
///
/// # Examples
/// ```rust,no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), archsim_sim::SimulationError> {
/// use archsim_core::{Architecture, SimulationConfig};
/// use archsim_sim::{Simulation, spawn_simulation};
///
/// let architecture = Architecture::load("demos/web-app.json".as_ref())?;
/// let handle = spawn_simulation(Simulation::new(architecture, SimulationConfig::default()));
/// handle.start().await?;
/// let result = handle.wait_for_completion().await?;
/// println!("{} requests", result.summary.total_requests);
/// # Ok(())
/// # }
/// ```
pub fn spawn_simulation(simulation: Simulation) -> SimulationHandle {
    let (sender, receiver) = mpsc::channel(64);
    let (status_sender, status_receiver) = watch::channel(simulation.status());
    let events = simulation.event_observers();
    let metrics = simulation.metrics_observers();

    tokio::spawn(async move {
        run_actor_loop(simulation, receiver, status_sender).await;
    });

    SimulationHandle::new(sender, status_receiver, events, metrics)
}

/// Processes commands and fires ticks until shutdown.
///
/// Ticks are only scheduled while the simulation is running. The deadline is
/// re-armed whenever the run (re)enters Running or its interval changes, so a
/// pause never produces a burst of catch-up ticks.
async fn run_actor_loop(
    mut simulation: Simulation,
    mut receiver: mpsc::Receiver<SimulationCommand>,
    status: watch::Sender<SimulationStatus>,
) {
    tracing::debug!(run_id = %simulation.run_id(), "Simulation actor started");

    let mut interval = simulation.tick_interval();
    let mut next_tick = Instant::now() + interval;

    loop {
        let running = simulation.status() == SimulationStatus::Running;

        tokio::select! {
            command = receiver.recv() => {
                let Some(command) = command else {
                    break;
                };
                if !handle_command(&mut simulation, command) {
                    break;
                }

                let now_running = simulation.status() == SimulationStatus::Running;
                let new_interval = simulation.tick_interval();
                if now_running && (!running || new_interval != interval) {
                    next_tick = Instant::now() + new_interval;
                }
                interval = new_interval;
            }
            _ = tokio::time::sleep_until(next_tick), if running => {
                simulation.tick();
                next_tick = Instant::now() + interval;
            }
        }

        status.send_replace(simulation.status());
    }

    tracing::debug!("Simulation actor stopped");
}

/// Applies one command. Returns false to shut the actor down.
fn handle_command(simulation: &mut Simulation, command: SimulationCommand) -> bool {
    match command {
        SimulationCommand::Start { responder } => {
            simulation.start();
            let _ = responder.send(simulation.status());
        }

        SimulationCommand::Pause { responder } => {
            simulation.pause();
            let _ = responder.send(simulation.status());
        }

        SimulationCommand::Resume { responder } => {
            simulation.resume();
            let _ = responder.send(simulation.status());
        }

        SimulationCommand::Stop { responder } => {
            simulation.stop();
            let _ = responder.send(simulation.status());
        }

        SimulationCommand::SetSpeed { speed, responder } => {
            simulation.set_speed(speed);
            let _ = responder.send(simulation.speed());
        }

        SimulationCommand::Reset { responder } => {
            simulation.reset();
            let _ = responder.send(simulation.status());
        }

        SimulationCommand::GetState { responder } => {
            let _ = responder.send(simulation.state());
        }

        SimulationCommand::GetResult { responder } => {
            let _ = responder.send(simulation.result());
        }

        SimulationCommand::Shutdown { responder } => {
            tracing::debug!("Simulation actor shutting down");
            let _ = responder.send(());
            return false;
        }
    }

    true
}
