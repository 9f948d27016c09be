//! Headless execution and side-by-side comparison of configurations.

use archsim_core::{Architecture, SimulationConfig};
use serde::{Deserialize, Serialize};

use crate::SimulationError;
use crate::analysis::SimulationResult;
use crate::engine::Simulation;
use crate::lifecycle::SimulationStatus;

/// Ticks `simulation` without wall-clock delay until it stops or completes.
///
/// Starts the run if needed. The loop is bounded by the tick count the
/// configured duration implies.
pub fn run_to_completion(simulation: &mut Simulation) -> SimulationResult {
    simulation.start();

    let budget = simulation.tick_budget();
    let mut ticks = 0;
    while simulation.status() == SimulationStatus::Running && ticks <= budget {
        simulation.tick();
        ticks += 1;
    }

    tracing::debug!(ticks, status = ?simulation.status(), "Headless run finished");
    simulation.result()
}

/// Validates `config` and runs a fresh simulation over `architecture`.
///
/// # Errors
/// - `SimulationError::Config` - Configuration values out of range
pub fn simulate(
    architecture: Architecture,
    config: SimulationConfig,
) -> Result<SimulationResult, SimulationError> {
    config.validate()?;
    let mut simulation = Simulation::new(architecture, config);
    Ok(run_to_completion(&mut simulation))
}

/// Candidate minus baseline for headline figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonDelta {
    pub success_rate: f64,
    pub average_latency: f64,
    pub peak_rps: f64,
    pub bottlenecks: i64,
}

/// Results of two isolated runs over the same architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub baseline: SimulationResult,
    pub candidate: SimulationResult,
    pub delta: ComparisonDelta,
}

impl Comparison {
    fn new(baseline: SimulationResult, candidate: SimulationResult) -> Self {
        let (base, cand) = (&baseline.summary, &candidate.summary);
        let delta = ComparisonDelta {
            success_rate: cand.success_rate - base.success_rate,
            average_latency: cand.average_latency - base.average_latency,
            peak_rps: cand.peak_rps - base.peak_rps,
            bottlenecks: cand.bottlenecks.len() as i64 - base.bottlenecks.len() as i64,
        };
        Self {
            baseline,
            candidate,
            delta,
        }
    }
}

/// Runs `baseline` and `candidate` against copies of `architecture`.
///
/// # Errors
/// - `SimulationError::Config` - Either configuration is out of range
pub fn compare(
    architecture: &Architecture,
    baseline: SimulationConfig,
    candidate: SimulationConfig,
) -> Result<Comparison, SimulationError> {
    baseline.validate()?;
    candidate.validate()?;

    let baseline = simulate(architecture.clone(), baseline)?;
    let candidate = simulate(architecture.clone(), candidate)?;
    tracing::info!(
        baseline_run = %baseline.run_id,
        candidate_run = %candidate.run_id,
        "Comparison finished"
    );
    Ok(Comparison::new(baseline, candidate))
}

#[cfg(test)]
mod tests {
    use archsim_core::{Edge, Node, NodeType};

    use super::*;

    fn web_app() -> Architecture {
        Architecture::new(
            vec![
                Node::new("client", NodeType::Client),
                Node::new("lb", NodeType::LoadBalancer),
                Node::new("svc", NodeType::Service),
                Node::new("cache", NodeType::Cache),
                Node::new("db", NodeType::Database),
            ],
            vec![
                Edge::new("client", "lb"),
                Edge::new("lb", "svc"),
                Edge::new("svc", "cache"),
                Edge::new("cache", "db"),
            ],
        )
    }

    #[test]
    fn test_run_to_completion_reaches_duration() {
        let mut simulation = Simulation::new(web_app(), SimulationConfig::deterministic_testing());
        let result = run_to_completion(&mut simulation);

        assert_eq!(result.status, SimulationStatus::Completed);
        assert_eq!(result.duration, 5.0);
        assert_eq!(result.metrics_history.len(), 5);
        assert_eq!(result.seed, 42);
    }

    #[test]
    fn test_run_to_completion_on_finished_run_returns_cached_result() {
        let mut simulation = Simulation::new(web_app(), SimulationConfig::deterministic_testing());
        let first = run_to_completion(&mut simulation);
        let second = run_to_completion(&mut simulation);
        assert_eq!(first, second);
    }

    #[test]
    fn test_simulate_rejects_invalid_config() {
        let config = SimulationConfig {
            error_rate: 2.0,
            ..Default::default()
        };
        assert!(matches!(
            simulate(web_app(), config),
            Err(SimulationError::Config(_))
        ));
    }

    #[test]
    fn test_compare_reports_deltas() {
        let baseline = SimulationConfig::deterministic_testing();
        let candidate = SimulationConfig {
            error_rate: 0.5,
            ..SimulationConfig::deterministic_testing()
        };

        let comparison = compare(&web_app(), baseline, candidate).unwrap();
        assert_eq!(comparison.baseline.summary.failed_requests, 0);
        assert!(comparison.candidate.summary.failed_requests > 0);
        assert!(comparison.delta.success_rate < 0.0);
        assert_ne!(comparison.baseline.run_id, comparison.candidate.run_id);
    }
}
