use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use archsim_core::{Architecture, Edge, EventType, Node, NodeType, SimulationConfig};
use tokio_test::assert_ok;

use super::spawn_simulation;
use crate::SimulationError;
use crate::engine::Simulation;
use crate::lifecycle::SimulationStatus;

fn fast_simulation(duration_secs: u64) -> Simulation {
    let architecture = Architecture::new(
        vec![
            Node::new("client", NodeType::Client),
            Node::new("api", NodeType::ApiGateway),
            Node::new("db", NodeType::Database),
        ],
        vec![Edge::new("client", "api"), Edge::new("api", "db")],
    );
    let config = SimulationConfig {
        requests_per_second: 50.0,
        tick_rate_ms: 10,
        speed: 100.0,
        duration_secs,
        seed: Some(3),
        ..Default::default()
    };
    Simulation::new(architecture, config)
}

#[tokio::test]
async fn test_handle_runs_to_completion() {
    let handle = spawn_simulation(fast_simulation(1));
    assert_eq!(handle.status(), SimulationStatus::Idle);

    assert_eq!(assert_ok!(handle.start().await), SimulationStatus::Running);
    let result = tokio::time::timeout(Duration::from_secs(10), handle.wait_for_completion())
        .await
        .expect("run should finish")
        .unwrap();

    assert_eq!(result.status, SimulationStatus::Completed);
    assert_eq!(result.duration, 1.0);
    assert!(result.summary.total_requests > 0);
    assert_eq!(
        result
            .events
            .iter()
            .filter(|event| event.event_type == EventType::SimulationCompleted)
            .count(),
        1
    );
    assert_eq!(handle.status(), SimulationStatus::Completed);
}

#[tokio::test]
async fn test_pause_halts_ticks() {
    let mut simulation = fast_simulation(60);
    simulation.set_speed(1.0);
    let handle = spawn_simulation(simulation);

    assert_ok!(handle.start().await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(assert_ok!(handle.pause().await), SimulationStatus::Paused);

    let paused_at = handle.state().await.unwrap().current_time;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(handle.state().await.unwrap().current_time, paused_at);

    assert_eq!(handle.resume().await.unwrap(), SimulationStatus::Running);
    assert_eq!(handle.stop().await.unwrap(), SimulationStatus::Stopped);

    let result = handle.wait_for_completion().await.unwrap();
    assert_eq!(result.status, SimulationStatus::Stopped);
}

#[tokio::test]
async fn test_set_speed_reports_effective_speed() {
    let handle = spawn_simulation(fast_simulation(1));

    assert_eq!(handle.set_speed(5.0).await.unwrap(), 5.0);
    assert_eq!(handle.set_speed(-1.0).await.unwrap(), 5.0);
    assert_eq!(handle.set_speed(f64::INFINITY).await.unwrap(), 5.0);
    assert_eq!(handle.state().await.unwrap().speed, 5.0);
}

#[tokio::test]
async fn test_subscribers_registered_through_handle() {
    let handle = spawn_simulation(fast_simulation(1));
    let seen = Arc::new(AtomicUsize::new(0));

    let counter = seen.clone();
    let _subscription = handle.on_event(move |event| {
        if event.event_type == EventType::RequestCompleted {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    handle.start().await.unwrap();
    let result = handle.wait_for_completion().await.unwrap();

    assert_eq!(
        seen.load(Ordering::SeqCst) as u64,
        result.summary.successful_requests
    );
}

#[tokio::test]
async fn test_reset_returns_to_idle() {
    let handle = spawn_simulation(fast_simulation(1));
    handle.start().await.unwrap();
    handle.wait_for_completion().await.unwrap();

    assert_eq!(handle.reset().await.unwrap(), SimulationStatus::Idle);
    let state = handle.state().await.unwrap();
    assert_eq!(state.current_time, 0);
    assert!(state.events.is_empty());
}

#[tokio::test]
async fn test_commands_fail_after_shutdown() {
    let handle = spawn_simulation(fast_simulation(1));
    handle.shutdown().await.unwrap();

    assert!(matches!(
        handle.start().await,
        Err(SimulationError::EngineShutdown)
    ));
    assert!(matches!(
        handle.wait_for_completion().await,
        Err(SimulationError::EngineShutdown)
    ));
}

#[tokio::test]
async fn test_tiny_speed_keeps_actor_alive() {
    let handle = spawn_simulation(fast_simulation(1));

    assert_eq!(assert_ok!(handle.set_speed(1e-300).await), 1e-300);
    assert_eq!(assert_ok!(handle.start().await), SimulationStatus::Running);
    assert_eq!(assert_ok!(handle.state().await).current_time, 0);

    assert_eq!(assert_ok!(handle.set_speed(100.0).await), 100.0);
    let result = tokio::time::timeout(Duration::from_secs(10), handle.wait_for_completion())
        .await
        .expect("run should finish")
        .unwrap();
    assert_eq!(result.status, SimulationStatus::Completed);
}
