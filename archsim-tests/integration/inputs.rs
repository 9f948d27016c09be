//! Loading architectures and configs from disk

use std::io::Write;
use std::path::PathBuf;

use archsim_core::{
    Architecture, ArchitectureError, ConsistencyMode, NodeType, SimulationConfig,
};
use archsim_sim::{SimulationError, compare, simulate};
use tempfile::NamedTempFile;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../demos")
        .join(name)
}

fn temp_json(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_demo_architecture_is_valid() {
    let architecture = Architecture::load(&demo("web-app.json")).unwrap();
    let warnings = architecture.validate().unwrap();

    assert!(warnings.is_empty(), "{warnings:?}");
    assert!(architecture.has_node_type(NodeType::Cache));
    assert!(architecture.has_node_type(NodeType::LoadBalancer));
}

#[test]
fn test_demo_configs_load_and_validate() {
    for name in ["baseline.json", "black-friday.json"] {
        let config = SimulationConfig::load(&demo(name)).unwrap();
        config.validate().unwrap();
        assert_eq!(config.seed, Some(42));
    }

    let surge = SimulationConfig::load(&demo("black-friday.json")).unwrap();
    assert_eq!(surge.network_latency.latency(NodeType::Client, NodeType::Cdn), 25.0);
    assert_eq!(
        surge
            .network_latency
            .latency(NodeType::Client, NodeType::Database),
        12.0
    );
}

#[test]
fn test_partial_config_takes_defaults() {
    let file = temp_json(r#"{ "requests_per_second": 12.5, "consistency_mode": "eventual" }"#);
    let config = SimulationConfig::load(file.path()).unwrap();

    assert_eq!(config.requests_per_second, 12.5);
    assert_eq!(config.consistency_mode, ConsistencyMode::Eventual);
    assert_eq!(config.tick_rate_ms, 100);
    assert_eq!(config.duration_secs, 60);
}

#[test]
fn test_dangling_edge_rejected_by_validation() {
    let file = temp_json(
        r#"{
            "nodes": [{ "id": "web", "type": "CLIENT", "label": "Web" }],
            "edges": [{ "source": "web", "target": "api" }]
        }"#,
    );
    let architecture = Architecture::load(file.path()).unwrap();

    assert!(matches!(
        architecture.validate(),
        Err(ArchitectureError::DanglingEdge { .. })
    ));
}

#[test]
fn test_compare_demo_configs() {
    let architecture = Architecture::load(&demo("web-app.json")).unwrap();
    let mut baseline = SimulationConfig::load(&demo("baseline.json")).unwrap();
    let mut candidate = SimulationConfig::load(&demo("black-friday.json")).unwrap();
    baseline.duration_secs = 3;
    candidate.duration_secs = 3;

    let comparison = compare(&architecture, baseline, candidate).unwrap();

    assert!(comparison.delta.peak_rps > 0.0);
    assert!(comparison.candidate.summary.total_requests > comparison.baseline.summary.total_requests);
    assert_eq!(
        comparison.delta.bottlenecks,
        comparison.candidate.summary.bottlenecks.len() as i64
            - comparison.baseline.summary.bottlenecks.len() as i64
    );
}

#[test]
fn test_result_serializes_with_wire_names() {
    let architecture = Architecture::load(&demo("web-app.json")).unwrap();
    let config = SimulationConfig {
        duration_secs: 1,
        seed: Some(9),
        ..SimulationConfig::deterministic_testing()
    };
    let result = simulate(architecture, config).unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "completed");
    assert_eq!(json["events"][0]["type"], "SIMULATION_STARTED");
    assert_eq!(json["events"][0]["severity"], "info");
}

#[test]
fn test_invalid_config_rejected_before_run() {
    let architecture = Architecture::load(&demo("web-app.json")).unwrap();
    let config = SimulationConfig {
        cache_hit_ratio: -0.5,
        ..Default::default()
    };

    assert!(matches!(
        simulate(architecture, config),
        Err(SimulationError::Config(_))
    ));
}
