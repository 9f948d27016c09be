//! CLI command implementations

use std::path::{Path, PathBuf};

use anyhow::Context;
use archsim_core::{Architecture, ArchsimError, SimulationConfig, SimulationEvent};
use archsim_sim::{
    Comparison, Simulation, SimulationResult, compare, run_to_completion, spawn_simulation,
};
use clap::Subcommand;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Simulate traffic through an architecture
    Run {
        /// Path to the architecture JSON file
        architecture: PathBuf,
        /// Simulation config JSON; defaults plus ARCHSIM_* overrides when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
        /// Simulated duration in seconds
        #[arg(short, long)]
        duration: Option<u64>,
        /// Requests generated per simulated second
        #[arg(long)]
        rps: Option<f64>,
        /// Pace ticks in wall-clock time instead of running headless
        #[arg(long)]
        realtime: bool,
        /// Wall-clock speed multiplier for realtime runs
        #[arg(long)]
        speed: Option<f64>,
        /// Write the full result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print every event as it is emitted
        #[arg(long)]
        events: bool,
    },
    /// Run two configurations against the same architecture
    Compare {
        /// Path to the architecture JSON file
        architecture: PathBuf,
        /// Baseline config JSON
        #[arg(long)]
        baseline: PathBuf,
        /// Candidate config JSON
        #[arg(long)]
        candidate: PathBuf,
        /// Write both results and the deltas as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check an architecture file for structural problems
    Validate {
        /// Path to the architecture JSON file
        architecture: PathBuf,
    },
}

/// Overrides from `run` flags applied on top of the loaded config.
struct RunOverrides {
    seed: Option<u64>,
    duration: Option<u64>,
    rps: Option<f64>,
    speed: Option<f64>,
}

impl RunOverrides {
    fn apply(self, mut config: SimulationConfig) -> SimulationConfig {
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(duration) = self.duration {
            config.duration_secs = duration;
        }
        if let Some(rps) = self.rps {
            config.requests_per_second = rps;
        }
        if let Some(speed) = self.speed {
            config.speed = speed;
        }
        config
    }
}

/// Handle the CLI command
///
/// # Errors
/// Returns the input, validation or output error of the failing command
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            architecture,
            config,
            seed,
            duration,
            rps,
            realtime,
            speed,
            output,
            events,
        } => {
            let overrides = RunOverrides {
                seed,
                duration,
                rps,
                speed,
            };
            run(
                &architecture,
                config.as_deref(),
                overrides,
                realtime,
                output.as_deref(),
                events,
            )
            .await
        }
        Commands::Compare {
            architecture,
            baseline,
            candidate,
            output,
        } => compare_configs(&architecture, &baseline, &candidate, output.as_deref()),
        Commands::Validate { architecture } => validate(&architecture),
    }
}

/// Loads and structurally validates an architecture, printing warnings.
fn load_architecture(path: &Path) -> anyhow::Result<Architecture> {
    let loaded = Architecture::load(path).and_then(|architecture| {
        let warnings = architecture.validate()?;
        Ok((architecture, warnings))
    });

    let (architecture, warnings) = loaded
        .map_err(|e| anyhow::anyhow!(ArchsimError::from(e).user_message()))
        .with_context(|| format!("Failed to load {}", path.display()))?;

    for warning in warnings {
        tracing::warn!(path = %path.display(), "{warning}");
        eprintln!("warning: {warning}");
    }
    tracing::info!(
        nodes = architecture.nodes.len(),
        edges = architecture.edges.len(),
        "Architecture loaded"
    );
    Ok(architecture)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SimulationConfig> {
    match path {
        Some(path) => SimulationConfig::load(path)
            .map_err(|e| anyhow::anyhow!(ArchsimError::from(e).user_message()))
            .with_context(|| format!("Failed to load {}", path.display())),
        None => Ok(SimulationConfig::from_env()),
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn print_event(event: &SimulationEvent) {
    println!(
        "[{:>7}ms] {:<20} {}",
        event.timestamp,
        event.event_type.as_str(),
        event.message
    );
}

/// Simulate one architecture
///
/// # Errors
/// - Architecture or config file missing, malformed or invalid
/// - Result file cannot be written
async fn run(
    architecture_path: &Path,
    config_path: Option<&Path>,
    overrides: RunOverrides,
    realtime: bool,
    output: Option<&Path>,
    print_events: bool,
) -> anyhow::Result<()> {
    let architecture = load_architecture(architecture_path)?;
    let config = overrides.apply(load_config(config_path)?);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!(ArchsimError::from(e).user_message()))?;

    let mut simulation = Simulation::new(architecture, config);
    println!(
        "Simulating {} for {}s at {} req/s (seed {})",
        architecture_path.display(),
        simulation.config().duration_secs,
        simulation.config().requests_per_second,
        simulation.seed()
    );

    let _subscription = print_events.then(|| simulation.on_event(print_event));

    let result = if realtime {
        let handle = spawn_simulation(simulation);
        handle.start().await?;
        let result = handle.wait_for_completion().await?;
        handle.shutdown().await?;
        result
    } else {
        run_to_completion(&mut simulation)
    };

    print_summary(&result);

    if let Some(path) = output {
        write_json(path, &result)?;
    }
    Ok(())
}

fn print_summary(result: &SimulationResult) {
    let summary = &result.summary;
    println!();
    println!("Run {} ({:?}, {:.1}s simulated)", result.run_id, result.status, result.duration);
    println!("  Requests:        {}", summary.total_requests);
    println!("  Successful:      {}", summary.successful_requests);
    println!("  Failed:          {}", summary.failed_requests);
    println!("  Success rate:    {:.1}%", summary.success_rate * 100.0);
    println!("  Avg latency:     {:.1}ms", summary.average_latency);
    println!("  Peak RPS:        {:.1}", summary.peak_rps);
    println!("  Scaling actions: {}", summary.total_scaling_actions);

    if !summary.bottlenecks.is_empty() {
        println!();
        println!("Bottlenecks:");
        for bottleneck in &summary.bottlenecks {
            println!(
                "  [{:?}] {} ({})",
                bottleneck.severity, bottleneck.node_label, bottleneck.node_type
            );
            for issue in &bottleneck.issues {
                println!("    - {issue}");
            }
            for recommendation in &bottleneck.recommendations {
                println!("    > {recommendation}");
            }
        }
    }

    println!();
    println!("Recommendations:");
    for recommendation in &summary.recommendations {
        println!("  - {recommendation}");
    }
}

/// Compare two configurations on one architecture
///
/// # Errors
/// - Architecture or either config file missing, malformed or invalid
/// - Result file cannot be written
pub fn compare_configs(
    architecture_path: &Path,
    baseline_path: &Path,
    candidate_path: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let architecture = load_architecture(architecture_path)?;
    let baseline = load_config(Some(baseline_path))?;
    let candidate = load_config(Some(candidate_path))?;

    let comparison = compare(&architecture, baseline, candidate)?;
    print_comparison(&comparison);

    if let Some(path) = output {
        write_json(path, &comparison)?;
    }
    Ok(())
}

fn print_comparison(comparison: &Comparison) {
    let (base, cand) = (&comparison.baseline.summary, &comparison.candidate.summary);
    let delta = &comparison.delta;

    println!("{:<16} {:>12} {:>12} {:>12}", "", "baseline", "candidate", "delta");
    println!(
        "{:<16} {:>11.1}% {:>11.1}% {:>+11.1}%",
        "Success rate",
        base.success_rate * 100.0,
        cand.success_rate * 100.0,
        delta.success_rate * 100.0
    );
    println!(
        "{:<16} {:>10.1}ms {:>10.1}ms {:>+10.1}ms",
        "Avg latency", base.average_latency, cand.average_latency, delta.average_latency
    );
    println!(
        "{:<16} {:>12.1} {:>12.1} {:>+12.1}",
        "Peak RPS", base.peak_rps, cand.peak_rps, delta.peak_rps
    );
    println!(
        "{:<16} {:>12} {:>12} {:>+12}",
        "Bottlenecks",
        base.bottlenecks.len(),
        cand.bottlenecks.len(),
        delta.bottlenecks
    );
}

/// Validate an architecture file
///
/// # Errors
/// - Architecture file missing, malformed or structurally invalid
pub fn validate(architecture_path: &Path) -> anyhow::Result<()> {
    let architecture = load_architecture(architecture_path)?;
    println!(
        "{} is valid: {} nodes, {} edges",
        architecture_path.display(),
        architecture.nodes.len(),
        architecture.edges.len()
    );
    Ok(())
}
