//! Handle for communicating with the simulation actor.

use archsim_core::{SimulationEvent, SystemMetrics};
use tokio::sync::{mpsc, oneshot, watch};

use super::commands::SimulationCommand;
use crate::SimulationError;
use crate::analysis::SimulationResult;
use crate::engine::SimulationState;
use crate::lifecycle::SimulationStatus;
use crate::observers::{Observers, Subscription};

/// Cloneable async interface to a running simulation actor.
///
/// Every method fails with `SimulationError::EngineShutdown` once the actor
/// has stopped.
#[derive(Clone)]
pub struct SimulationHandle {
    sender: mpsc::Sender<SimulationCommand>,
    status: watch::Receiver<SimulationStatus>,
    events: Observers<SimulationEvent>,
    metrics: Observers<SystemMetrics>,
}

impl SimulationHandle {
    pub(super) fn new(
        sender: mpsc::Sender<SimulationCommand>,
        status: watch::Receiver<SimulationStatus>,
        events: Observers<SimulationEvent>,
        metrics: Observers<SystemMetrics>,
    ) -> Self {
        Self {
            sender,
            status,
            events,
            metrics,
        }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SimulationCommand,
    ) -> Result<T, SimulationError> {
        let (responder, rx) = oneshot::channel();

        self.sender
            .send(command(responder))
            .await
            .map_err(|_| SimulationError::EngineShutdown)?;

        rx.await.map_err(|_| SimulationError::EngineShutdown)
    }

    /// Starts or resumes the run. Returns the resulting status.
    ///
    /// # Errors
    /// - `SimulationError::EngineShutdown` - Actor is no longer running
    pub async fn start(&self) -> Result<SimulationStatus, SimulationError> {
        self.request(|responder| SimulationCommand::Start { responder })
            .await
    }

    /// Pauses a running simulation.
    ///
    /// # Errors
    /// - `SimulationError::EngineShutdown` - Actor is no longer running
    pub async fn pause(&self) -> Result<SimulationStatus, SimulationError> {
        self.request(|responder| SimulationCommand::Pause { responder })
            .await
    }

    /// Resumes a paused simulation.
    ///
    /// # Errors
    /// - `SimulationError::EngineShutdown` - Actor is no longer running
    pub async fn resume(&self) -> Result<SimulationStatus, SimulationError> {
        self.request(|responder| SimulationCommand::Resume { responder })
            .await
    }

    /// Stops the run and freezes its result.
    ///
    /// # Errors
    /// - `SimulationError::EngineShutdown` - Actor is no longer running
    pub async fn stop(&self) -> Result<SimulationStatus, SimulationError> {
        self.request(|responder| SimulationCommand::Stop { responder })
            .await
    }

    /// Changes the speed multiplier and returns the speed now in effect.
    ///
    /// Non-finite or non-positive values leave the speed unchanged.
    ///
    /// # Errors
    /// - `SimulationError::EngineShutdown` - Actor is no longer running
    pub async fn set_speed(&self, speed: f64) -> Result<f64, SimulationError> {
        self.request(|responder| SimulationCommand::SetSpeed { speed, responder })
            .await
    }

    /// Returns the run to Idle, discarding all state.
    ///
    /// # Errors
    /// - `SimulationError::EngineShutdown` - Actor is no longer running
    pub async fn reset(&self) -> Result<SimulationStatus, SimulationError> {
        self.request(|responder| SimulationCommand::Reset { responder })
            .await
    }

    /// Fetches a copy of the current engine state.
    ///
    /// # Errors
    /// - `SimulationError::EngineShutdown` - Actor is no longer running
    pub async fn state(&self) -> Result<SimulationState, SimulationError> {
        self.request(|responder| SimulationCommand::GetState { responder })
            .await
    }

    /// Fetches the run's result, best-effort while it is still active.
    ///
    /// # Errors
    /// - `SimulationError::EngineShutdown` - Actor is no longer running
    pub async fn result(&self) -> Result<SimulationResult, SimulationError> {
        self.request(|responder| SimulationCommand::GetResult { responder })
            .await
    }

    /// Waits until the run is stopped or completed, then returns its result.
    ///
    /// # Errors
    /// - `SimulationError::EngineShutdown` - Actor stopped before the run ended
    pub async fn wait_for_completion(&self) -> Result<SimulationResult, SimulationError> {
        let mut status = self.status.clone();
        status
            .wait_for(|status| status.is_terminal())
            .await
            .map_err(|_| SimulationError::EngineShutdown)?;
        self.result().await
    }

    /// Status as last published by the actor.
    pub fn status(&self) -> SimulationStatus {
        *self.status.borrow()
    }

    /// Stops the actor loop.
    ///
    /// # Errors
    /// - `SimulationError::EngineShutdown` - Actor had already stopped
    pub async fn shutdown(&self) -> Result<(), SimulationError> {
        self.request(|responder| SimulationCommand::Shutdown { responder })
            .await
    }

    /// Registers an event callback. It runs on the actor task.
    pub fn on_event<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SimulationEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(callback)
    }

    /// Registers a per-tick metrics callback. It runs on the actor task.
    pub fn on_metrics_update<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SystemMetrics) + Send + Sync + 'static,
    {
        self.metrics.subscribe(callback)
    }
}
