//! Archsim Core - Architecture model for traffic simulation
//!
//! This crate provides the data the simulation engine consumes and emits: the
//! typed architecture graph, run configuration, metrics records, the event
//! log, and tracing setup shared by hosts.

pub mod architecture;
pub mod config;
pub mod event;
pub mod metrics;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use architecture::{Architecture, ArchitectureError, Edge, Node, NodeType, edge_key};
pub use config::{ConfigError, ConsistencyMode, LatencyMatrix, SimulationConfig};
pub use event::{EventDraft, EventLog, EventType, Severity, SimulationEvent};
pub use metrics::{EdgeMetrics, MetricsSnapshot, NodeMetrics, SystemMetrics};

/// Errors that can bubble up from loading inputs for a run.
#[derive(Debug, thiserror::Error)]
pub enum ArchsimError {
    #[error("Architecture error: {0}")]
    Architecture(#[from] ArchitectureError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ArchsimError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            ArchsimError::Architecture(ArchitectureError::Parse(e)) => {
                format!("Architecture file is not valid: {e}")
            }
            ArchsimError::Architecture(e) => format!("Architecture problem: {e}"),
            ArchsimError::Config(e) => format!("Invalid configuration: {e}"),
            ArchsimError::Io(_) => "File system error occurred".to_string(),
            ArchsimError::Serialization(_) => "Could not encode simulation output".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ArchsimError::Architecture(_) | ArchsimError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ArchsimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_user_errors() {
        let err: ArchsimError = ArchitectureError::Empty.into();
        assert!(err.is_user_error());
        assert!(err.user_message().contains("no nodes"));

        let err: ArchsimError = std::io::Error::other("disk").into();
        assert!(!err.is_user_error());
    }
}
