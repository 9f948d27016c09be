//! Run lifecycle states and the transitions allowed between them.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a simulation run.
///
/// `Idle -> Running -> {Paused <-> Running} -> Stopped | Completed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
    Completed,
}

impl SimulationStatus {
    /// Returns true if the run has ended.
    pub fn is_terminal(self) -> bool {
        matches!(self, SimulationStatus::Stopped | SimulationStatus::Completed)
    }

    /// `start` moves Idle, Paused and Stopped runs to Running.
    pub fn can_start(self) -> bool {
        matches!(
            self,
            SimulationStatus::Idle | SimulationStatus::Paused | SimulationStatus::Stopped
        )
    }

    pub fn can_pause(self) -> bool {
        self == SimulationStatus::Running
    }

    pub fn can_resume(self) -> bool {
        self == SimulationStatus::Paused
    }

    /// `stop` applies to runs that have started and not yet ended.
    pub fn can_stop(self) -> bool {
        matches!(self, SimulationStatus::Running | SimulationStatus::Paused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_guards() {
        use SimulationStatus::*;

        assert!(Idle.can_start() && Paused.can_start() && Stopped.can_start());
        assert!(!Running.can_start() && !Completed.can_start());

        assert!(Running.can_pause());
        assert!(!Paused.can_pause() && !Idle.can_pause());

        assert!(Paused.can_resume());
        assert!(!Running.can_resume() && !Stopped.can_resume());

        assert!(Running.can_stop() && Paused.can_stop());
        assert!(!Idle.can_stop() && !Stopped.can_stop() && !Completed.can_stop());
    }

    #[test]
    fn test_terminal_states() {
        assert!(SimulationStatus::Stopped.is_terminal());
        assert!(SimulationStatus::Completed.is_terminal());
        assert!(!SimulationStatus::Paused.is_terminal());
    }
}
