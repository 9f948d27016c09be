//! Centralized simulation configuration.
//!
//! All tunable traffic and node-behavior parameters live here so the engine
//! never hard-codes run-specific values.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::architecture::NodeType;

/// Network latency used when a type pair is absent from the matrix.
pub const DEFAULT_NETWORK_LATENCY_MS: f64 = 10.0;

/// Configuration validation and loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{field} must be within [0, 1], got {value}")]
    RatioOutOfRange { field: &'static str, value: f64 },

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
}

/// Consistency model advertised for stateful components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyMode {
    #[default]
    Strong,
    Eventual,
}

/// One entry of the network latency matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyEntry {
    pub from: NodeType,
    pub to: NodeType,
    pub latency_ms: f64,
}

/// Network latency lookup keyed by ordered node-type pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LatencyMatrixRepr", into = "LatencyMatrixRepr")]
pub struct LatencyMatrix {
    routes: HashMap<(NodeType, NodeType), f64>,
    fallback_ms: f64,
}

#[derive(Serialize, Deserialize)]
struct LatencyMatrixRepr {
    #[serde(default)]
    routes: Vec<LatencyEntry>,
    #[serde(default = "default_fallback_ms")]
    fallback_ms: f64,
}

fn default_fallback_ms() -> f64 {
    DEFAULT_NETWORK_LATENCY_MS
}

impl From<LatencyMatrixRepr> for LatencyMatrix {
    fn from(repr: LatencyMatrixRepr) -> Self {
        let mut matrix = LatencyMatrix::empty();
        matrix.fallback_ms = repr.fallback_ms;
        for entry in repr.routes {
            matrix.insert(entry.from, entry.to, entry.latency_ms);
        }
        matrix
    }
}

impl From<LatencyMatrix> for LatencyMatrixRepr {
    fn from(matrix: LatencyMatrix) -> Self {
        let mut routes: Vec<LatencyEntry> = matrix
            .routes
            .into_iter()
            .map(|((from, to), latency_ms)| LatencyEntry {
                from,
                to,
                latency_ms,
            })
            .collect();
        routes.sort_by_key(|entry| (entry.from, entry.to));
        Self {
            routes,
            fallback_ms: matrix.fallback_ms,
        }
    }
}

impl Default for LatencyMatrix {
    fn default() -> Self {
        use NodeType::*;

        let mut matrix = Self::empty();
        for (from, to, latency_ms) in [
            (Client, Cdn, 15.0),
            (Client, ApiGateway, 20.0),
            (Client, LoadBalancer, 20.0),
            (Client, RateLimiter, 20.0),
            (Cdn, ObjectStorage, 25.0),
            (Cdn, ApiGateway, 5.0),
            (RateLimiter, ApiGateway, 1.0),
            (RateLimiter, Service, 1.0),
            (ApiGateway, RateLimiter, 1.0),
            (ApiGateway, LoadBalancer, 2.0),
            (ApiGateway, Service, 5.0),
            (LoadBalancer, Service, 3.0),
            (Service, Service, 5.0),
            (Service, Cache, 1.0),
            (Service, Database, 2.0),
            (Service, Queue, 3.0),
            (Service, Pubsub, 3.0),
            (Service, ObjectStorage, 10.0),
            (Service, Metrics, 2.0),
            (Cache, Database, 2.0),
            (Queue, Service, 3.0),
            (Pubsub, Service, 3.0),
        ] {
            matrix.insert(from, to, latency_ms);
        }
        matrix
    }
}

impl LatencyMatrix {
    /// Creates a matrix with no routes and the default fallback.
    pub fn empty() -> Self {
        Self {
            routes: HashMap::new(),
            fallback_ms: DEFAULT_NETWORK_LATENCY_MS,
        }
    }

    /// Sets the latency for the ordered pair `from -> to`.
    pub fn insert(&mut self, from: NodeType, to: NodeType, latency_ms: f64) {
        self.routes.insert((from, to), latency_ms);
    }

    /// Returns the latency for `from -> to`, or the fallback when absent.
    pub fn latency(&self, from: NodeType, to: NodeType) -> f64 {
        self.routes
            .get(&(from, to))
            .copied()
            .unwrap_or(self.fallback_ms)
    }

    /// Latency used for pairs missing from the matrix.
    pub fn fallback_ms(&self) -> f64 {
        self.fallback_ms
    }
}

/// Parameters governing traffic generation and node behavior for one run.
///
/// Immutable for the lifetime of a run except for `speed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Synthetic requests generated per simulated second
    pub requests_per_second: f64,
    /// Advertised concurrent user population
    pub concurrent_users: u32,
    /// Request payload size in KB
    pub payload_size_kb: f64,
    /// Per-hop failure probability (0.0 to 1.0)
    pub error_rate: f64,
    /// Queue capacity used for backlog warnings and bottleneck analysis
    pub message_queue_depth: u32,
    /// Cache hit probability (0.0 to 1.0)
    pub cache_hit_ratio: f64,
    /// Database processing latency in milliseconds
    pub db_latency_ms: f64,
    /// Service processing latency in milliseconds
    pub service_cpu_cost_ms: f64,
    /// Enable feedback-driven scaling of SERVICE nodes
    pub auto_scaling: bool,
    /// Host-level failure injection toggle
    pub failure_injection: bool,
    /// Emit random overload warnings
    pub chaos_mode: bool,
    /// Decrement a queue's depth when a message moves downstream
    pub drain_queues: bool,
    pub consistency_mode: ConsistencyMode,
    /// Simulated run length in seconds
    pub duration_secs: u64,
    /// Simulated milliseconds per tick
    pub tick_rate_ms: u64,
    /// Wall-clock speed multiplier for scheduled runs
    pub speed: f64,
    /// Latency between node types
    pub network_latency: LatencyMatrix,
    /// Seed for reproducible runs; random when absent
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 100.0,
            concurrent_users: 1000,
            payload_size_kb: 10.0,
            error_rate: 0.01, // 1% per hop
            message_queue_depth: 1000,
            cache_hit_ratio: 0.8,
            db_latency_ms: 20.0,
            service_cpu_cost_ms: 10.0,
            auto_scaling: false,
            failure_injection: false,
            chaos_mode: false,
            drain_queues: false, // Queue depth only grows
            consistency_mode: ConsistencyMode::Strong,
            duration_secs: 60,
            tick_rate_ms: 100,
            speed: 1.0,
            network_latency: LatencyMatrix::default(),
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Creates a configuration for deterministic testing.
    pub fn deterministic_testing() -> Self {
        Self {
            error_rate: 0.0,   // No failures for reliable tests
            duration_secs: 5,  // Short runs
            seed: Some(42),    // Fixed seed for reproducible tests
            ..Self::default()
        }
    }

    /// Creates a configuration that drives services into scaling.
    pub fn stress_test() -> Self {
        Self {
            requests_per_second: 2000.0,
            concurrent_users: 50_000,
            error_rate: 0.02,
            auto_scaling: true,
            chaos_mode: true,
            duration_secs: 30,
            ..Self::default()
        }
    }

    /// Loads configuration from a JSON file. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Io` - File cannot be read
    /// - `ConfigError::Parse` - Malformed JSON
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Applies `ARCHSIM_*` environment variable overrides.
    ///
    /// Unparsable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
            std::env::var(name).ok()?.parse().ok()
        }

        if let Some(rps) = parse_env("ARCHSIM_REQUESTS_PER_SECOND") {
            self.requests_per_second = rps;
        }
        if let Some(rate) = parse_env("ARCHSIM_ERROR_RATE") {
            self.error_rate = rate;
        }
        if let Some(duration) = parse_env("ARCHSIM_DURATION_SECS") {
            self.duration_secs = duration;
        }
        if let Some(tick) = parse_env("ARCHSIM_TICK_RATE_MS") {
            self.tick_rate_ms = tick;
        }
        if let Some(enabled) = parse_env("ARCHSIM_AUTO_SCALING") {
            self.auto_scaling = enabled;
        }
        if let Some(enabled) = parse_env("ARCHSIM_CHAOS_MODE") {
            self.chaos_mode = enabled;
        }
        if let Some(enabled) = parse_env("ARCHSIM_DRAIN_QUEUES") {
            self.drain_queues = enabled;
        }
        if let Some(seed) = parse_env("ARCHSIM_SEED") {
            self.seed = Some(seed);
        }

        self
    }

    /// Creates configuration from defaults plus environment overrides.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Checks parameter ranges.
    ///
    /// # Errors
    ///
    /// - `ConfigError::RatioOutOfRange` - A probability lies outside [0, 1]
    /// - `ConfigError::NotPositive` - Tick rate, duration or speed is not positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("error_rate", self.error_rate),
            ("cache_hit_ratio", self.cache_hit_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::RatioOutOfRange { field, value });
            }
        }

        if self.tick_rate_ms == 0 {
            return Err(ConfigError::NotPositive {
                field: "tick_rate_ms",
            });
        }
        if self.duration_secs == 0 {
            return Err(ConfigError::NotPositive {
                field: "duration_secs",
            });
        }
        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(ConfigError::NotPositive { field: "speed" });
        }
        if !(self.requests_per_second >= 0.0) {
            return Err(ConfigError::NotPositive {
                field: "requests_per_second",
            });
        }

        Ok(())
    }

    /// Simulated run length in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.duration_secs.saturating_mul(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_matrix_fallback() {
        let matrix = LatencyMatrix::default();
        assert_eq!(matrix.latency(NodeType::Client, NodeType::ApiGateway), 20.0);
        assert_eq!(
            matrix.latency(NodeType::Client, NodeType::Database),
            DEFAULT_NETWORK_LATENCY_MS
        );
    }

    #[test]
    fn test_latency_matrix_is_ordered() {
        let mut matrix = LatencyMatrix::empty();
        matrix.insert(NodeType::Service, NodeType::Database, 3.0);
        assert_eq!(matrix.latency(NodeType::Service, NodeType::Database), 3.0);
        assert_eq!(matrix.latency(NodeType::Database, NodeType::Service), 10.0);
    }

    #[test]
    fn test_partial_config_takes_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"requests_per_second": 5, "auto_scaling": true}"#).unwrap();
        assert_eq!(config.requests_per_second, 5.0);
        assert!(config.auto_scaling);
        assert!(!config.drain_queues);
        assert_eq!(config.tick_rate_ms, 100);
        assert_eq!(config.network_latency, LatencyMatrix::default());
    }

    #[test]
    fn test_latency_matrix_serialized_as_route_list() {
        let json = r#"{"network_latency": {"routes": [
            {"from": "CLIENT", "to": "DATABASE", "latency_ms": 7}
        ]}}"#;
        let config: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config
                .network_latency
                .latency(NodeType::Client, NodeType::Database),
            7.0
        );
        assert_eq!(config.network_latency.fallback_ms(), 10.0);
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let config = SimulationConfig {
            error_rate: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RatioOutOfRange {
                field: "error_rate",
                ..
            })
        ));

        let config = SimulationConfig {
            tick_rate_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "tick_rate_ms"
            })
        ));

        let config = SimulationConfig {
            speed: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_presets_are_valid() {
        SimulationConfig::default().validate().unwrap();
        SimulationConfig::deterministic_testing().validate().unwrap();
        SimulationConfig::stress_test().validate().unwrap();
    }
}
