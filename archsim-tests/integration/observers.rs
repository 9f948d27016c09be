//! Subscriber fan-out from the engine

use std::sync::Arc;

use archsim_core::{EventType, NodeType};
use archsim_sim::{Simulation, Subscription};
use parking_lot::Mutex;

use crate::common::{architecture, quiet_config};

fn simulation() -> Simulation {
    Simulation::new(
        architecture(
            &[("client", NodeType::Client), ("db", NodeType::Database)],
            &[("client", "db")],
        ),
        quiet_config(50.0, 1),
    )
}

#[test]
fn test_unsubscribe_during_delivery() {
    let mut simulation = simulation();

    let once_seen = Arc::new(Mutex::new(Vec::new()));
    let all_seen = Arc::new(Mutex::new(Vec::new()));
    let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

    let seen = once_seen.clone();
    let own = slot.clone();
    let subscription = simulation.on_event(move |event| {
        seen.lock().push(event.id);
        if let Some(subscription) = own.lock().take() {
            subscription.unsubscribe();
        }
    });
    *slot.lock() = Some(subscription);

    let seen = all_seen.clone();
    let _all = simulation.on_event(move |event| seen.lock().push(event.id));

    simulation.start();
    simulation.tick();

    assert_eq!(once_seen.lock().len(), 1);
    let all: Vec<u64> = simulation.events().events().iter().map(|e| e.id).collect();
    assert_eq!(*all_seen.lock(), all);
}

#[test]
fn test_subscribers_see_events_in_emission_order() {
    let mut simulation = simulation();
    let types = Arc::new(Mutex::new(Vec::new()));

    let seen = types.clone();
    let _subscription = simulation.on_event(move |event| seen.lock().push(event.event_type));
    simulation.start();
    simulation.tick();

    let types = types.lock();
    assert_eq!(types[0], EventType::SimulationStarted);
    assert_eq!(types[1], EventType::RequestSent);
    // Every request resolves in its first tick: sent, query, completed
    let completed = types
        .iter()
        .filter(|t| **t == EventType::RequestCompleted)
        .count();
    let sent = types.iter().filter(|t| **t == EventType::RequestSent).count();
    assert_eq!(completed, sent);
}

#[test]
fn test_metrics_updates_once_per_tick() {
    let mut simulation = simulation();
    let timestamps = Arc::new(Mutex::new(Vec::new()));

    let seen = timestamps.clone();
    let _subscription =
        simulation.on_metrics_update(move |metrics| seen.lock().push(metrics.timestamp));
    archsim_sim::run_to_completion(&mut simulation);

    let expected: Vec<u64> = (1..=10).map(|tick| tick * 100).collect();
    assert_eq!(*timestamps.lock(), expected);
}
