//! Integration tests for Archsim
//!
//! These tests drive the engine through its public API only: whole runs over
//! small architectures, the scheduler actor, file inputs, and invariants that
//! must hold on every tick of arbitrary graphs.

#[path = "integration/common.rs"]
mod common;

#[path = "integration/engine_properties.rs"]
mod engine_properties;
#[path = "integration/inputs.rs"]
mod inputs;
#[path = "integration/observers.rs"]
mod observers;
#[path = "integration/scenarios.rs"]
mod scenarios;
#[path = "integration/scheduler.rs"]
mod scheduler;

#[path = "integration/panic_free_enforcement.rs"]
mod panic_free_enforcement;
