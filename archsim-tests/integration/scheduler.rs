//! Wall-clock scheduling through the actor handle

use std::time::Duration;

use archsim_core::{EventType, NodeType};
use archsim_sim::{Simulation, SimulationStatus, spawn_simulation};

use crate::common::{architecture, quiet_config};

fn fast(duration_secs: u64, speed: f64) -> Simulation {
    let mut config = quiet_config(40.0, duration_secs);
    config.tick_rate_ms = 20;
    config.speed = speed;
    Simulation::new(
        architecture(
            &[
                ("client", NodeType::Client),
                ("gateway", NodeType::ApiGateway),
                ("svc", NodeType::Service),
            ],
            &[("client", "gateway"), ("gateway", "svc")],
        ),
        config,
    )
}

#[tokio::test]
async fn test_realtime_run_matches_headless_run() {
    let handle = spawn_simulation(fast(2, 200.0));
    handle.start().await.unwrap();
    let realtime = tokio::time::timeout(Duration::from_secs(10), handle.wait_for_completion())
        .await
        .expect("realtime run finishes")
        .unwrap();

    let mut headless = fast(2, 200.0);
    let headless = archsim_sim::run_to_completion(&mut headless);

    assert_eq!(realtime.status, SimulationStatus::Completed);
    assert_eq!(realtime.events, headless.events);
    assert_eq!(realtime.summary, headless.summary);
}

#[tokio::test]
async fn test_no_tick_after_stop_returns() {
    let handle = spawn_simulation(fast(600, 10.0));
    handle.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(handle.stop().await.unwrap(), SimulationStatus::Stopped);
    let stopped_at = handle.state().await.unwrap().current_time;
    tokio::time::sleep(Duration::from_millis(30)).await;

    let state = handle.state().await.unwrap();
    assert_eq!(state.current_time, stopped_at);
    assert_eq!(
        state
            .events
            .iter()
            .filter(|event| event.event_type == EventType::SimulationStopped)
            .count(),
        1
    );

    let first = handle.result().await.unwrap();
    let second = handle.result().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_speed_change_while_running_keeps_ticking() {
    let handle = spawn_simulation(fast(600, 1.0));
    handle.start().await.unwrap();

    assert_eq!(handle.set_speed(50.0).await.unwrap(), 50.0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let before = handle.state().await.unwrap().current_time;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let after = handle.state().await.unwrap().current_time;

    assert!(after > before);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_handle_clones_share_one_actor() {
    let handle = spawn_simulation(fast(1, 500.0));
    let observer = handle.clone();

    handle.start().await.unwrap();
    let result = observer.wait_for_completion().await.unwrap();

    assert_eq!(result.status, SimulationStatus::Completed);
    assert_eq!(handle.status(), SimulationStatus::Completed);
}
