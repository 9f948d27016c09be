//! Tick-driven simulation engine.
//!
//! A `Simulation` owns all state for one run. Each call to `tick` advances
//! simulated time by a fixed step, generates traffic, moves requests one step
//! along their current hop, and refreshes metrics. Wall-clock pacing is the
//! scheduler's concern; the engine never sleeps.

mod state;


use std::collections::BTreeMap;
use std::time::Duration;

use archsim_core::{
    Architecture, EdgeMetrics, EventDraft, EventLog, EventType, MetricsSnapshot, NodeMetrics,
    NodeType, Severity, SimulationConfig, SimulationEvent, SystemMetrics, edge_key,
};
use chrono::Utc;
pub use state::SimulationState;
use uuid::Uuid;

use crate::analysis::{self, SimulationResult};
use crate::lifecycle::SimulationStatus;
use crate::observers::{Observers, Subscription};
use crate::processing::{self, processing_latency};
use crate::request::{ActiveRequest, RequestStatus};
use crate::rng::DeterministicRng;
use crate::routing::{FirstUnvisited, RoutingStrategy, find_next_hop};
use crate::scaling;
use crate::topology::Topology;

/// Probability per tick that chaos mode reports an overload.
const CHAOS_OVERLOAD_PROBABILITY: f64 = 0.05;

/// Mixed into the run seed for the chaos stream, keeping request outcomes
/// independent of `chaos_mode`.
const CHAOS_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Snapshot cadence in simulated milliseconds.
const SNAPSHOT_INTERVAL_MS: u64 = 1000;

/// Upper bound on the wall-clock gap between ticks.
const MAX_TICK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// One simulation run over a fixed architecture snapshot.
pub struct Simulation {
    run_id: Uuid,
    topology: Topology,
    config: SimulationConfig,
    routing: Box<dyn RoutingStrategy>,
    rng: DeterministicRng,
    chaos_rng: DeterministicRng,
    status: SimulationStatus,
    current_time: u64,
    next_request_id: u64,
    active_requests: Vec<ActiveRequest>,
    node_metrics: BTreeMap<String, NodeMetrics>,
    edge_metrics: BTreeMap<String, EdgeMetrics>,
    system: SystemMetrics,
    events: EventLog,
    history: Vec<MetricsSnapshot>,
    result: Option<SimulationResult>,
    event_observers: Observers<SimulationEvent>,
    metrics_observers: Observers<SystemMetrics>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("run_id", &self.run_id)
            .field("status", &self.status)
            .field("current_time", &self.current_time)
            .field("active_requests", &self.active_requests.len())
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Creates an idle simulation over a copy of `architecture`.
    ///
    /// A zero tick rate is raised to 1 ms and a non-positive speed reset to
    /// 1.0 so the tick loop always makes progress.
    pub fn new(architecture: Architecture, mut config: SimulationConfig) -> Self {
        if config.tick_rate_ms == 0 {
            tracing::warn!("tick_rate_ms of 0 raised to 1");
            config.tick_rate_ms = 1;
        }
        if !(config.speed.is_finite() && config.speed > 0.0) {
            tracing::warn!(speed = config.speed, "Invalid speed reset to 1.0");
            config.speed = 1.0;
        }

        let topology = Topology::new(architecture);
        let rng = DeterministicRng::from_optional_seed(config.seed);
        let chaos_rng = DeterministicRng::from_seed(rng.seed() ^ CHAOS_SEED_SALT);
        let node_metrics = Self::initial_node_metrics(&topology);

        tracing::debug!(
            nodes = topology.nodes().len(),
            senders = topology.senders().len(),
            seed = rng.seed(),
            "Simulation created"
        );

        Self {
            run_id: Uuid::new_v4(),
            topology,
            config,
            routing: Box::new(FirstUnvisited),
            rng,
            chaos_rng,
            status: SimulationStatus::Idle,
            current_time: 0,
            next_request_id: 1,
            active_requests: Vec::new(),
            node_metrics,
            edge_metrics: BTreeMap::new(),
            system: SystemMetrics::default(),
            events: EventLog::new(),
            history: Vec::new(),
            result: None,
            event_observers: Observers::new(),
            metrics_observers: Observers::new(),
        }
    }

    /// Replaces the default first-unvisited routing.
    pub fn with_routing(mut self, strategy: impl RoutingStrategy + 'static) -> Self {
        self.routing = Box::new(strategy);
        self
    }

    fn initial_node_metrics(topology: &Topology) -> BTreeMap<String, NodeMetrics> {
        topology
            .nodes()
            .iter()
            .map(|node| (node.id.clone(), NodeMetrics::new(node.node_type)))
            .collect()
    }

    // --- Lifecycle ---

    /// Enters Running from Idle, Paused or Stopped. No-op otherwise.
    pub fn start(&mut self) {
        if !self.status.can_start() {
            tracing::debug!(status = ?self.status, "start ignored");
            return;
        }

        let previous = self.status;
        self.status = SimulationStatus::Running;

        if previous == SimulationStatus::Paused {
            self.emit(EventDraft::new(
                EventType::SimulationResumed,
                Severity::Info,
                "Simulation resumed",
            ));
        } else {
            // A restarted run will synthesize a fresh result when it ends
            self.result = None;
            self.emit(
                EventDraft::new(
                    EventType::SimulationStarted,
                    Severity::Info,
                    format!(
                        "Simulation started: {} req/s for {}s",
                        self.config.requests_per_second, self.config.duration_secs
                    ),
                )
                .meta("seed", self.rng.seed()),
            );
        }
        tracing::info!(run_id = %self.run_id, "Simulation running");
    }

    /// Suspends a running simulation. No-op unless Running.
    pub fn pause(&mut self) {
        if !self.status.can_pause() {
            tracing::debug!(status = ?self.status, "pause ignored");
            return;
        }
        self.status = SimulationStatus::Paused;
        self.emit(EventDraft::new(
            EventType::SimulationPaused,
            Severity::Info,
            "Simulation paused",
        ));
        tracing::info!(time_ms = self.current_time, "Simulation paused");
    }

    /// Continues a paused simulation. No-op unless Paused.
    pub fn resume(&mut self) {
        if !self.status.can_resume() {
            tracing::debug!(status = ?self.status, "resume ignored");
            return;
        }
        self.status = SimulationStatus::Running;
        self.emit(EventDraft::new(
            EventType::SimulationResumed,
            Severity::Info,
            "Simulation resumed",
        ));
        tracing::info!(time_ms = self.current_time, "Simulation resumed");
    }

    /// Ends a running or paused simulation and synthesizes its result.
    ///
    /// No-op when Idle or already ended.
    pub fn stop(&mut self) {
        if !self.status.can_stop() {
            tracing::debug!(status = ?self.status, "stop ignored");
            return;
        }
        self.status = SimulationStatus::Stopped;
        self.emit(EventDraft::new(
            EventType::SimulationStopped,
            Severity::Warning,
            format!(
                "Simulation stopped at {:.1}s",
                self.current_time as f64 / 1000.0
            ),
        ));
        self.result = Some(self.build_result());
        tracing::info!(time_ms = self.current_time, "Simulation stopped");
    }

    /// Changes the wall-clock speed multiplier. Ignored unless finite and positive.
    pub fn set_speed(&mut self, speed: f64) {
        if !(speed.is_finite() && speed > 0.0) {
            tracing::warn!(speed, "Ignoring invalid speed");
            return;
        }
        self.config.speed = speed;
        tracing::debug!(speed, "Speed changed");
    }

    /// Discards all run state and returns to Idle. Subscribers stay registered.
    pub fn reset(&mut self) {
        self.run_id = Uuid::new_v4();
        self.rng = DeterministicRng::from_seed(self.rng.seed());
        self.chaos_rng = DeterministicRng::from_seed(self.rng.seed() ^ CHAOS_SEED_SALT);
        self.status = SimulationStatus::Idle;
        self.current_time = 0;
        self.next_request_id = 1;
        self.active_requests.clear();
        self.node_metrics = Self::initial_node_metrics(&self.topology);
        self.edge_metrics.clear();
        self.system = SystemMetrics::default();
        self.events = EventLog::new();
        self.history.clear();
        self.result = None;
        tracing::info!(run_id = %self.run_id, "Simulation reset");
    }

    fn complete(&mut self) {
        if self.status == SimulationStatus::Completed {
            return;
        }
        self.status = SimulationStatus::Completed;
        self.emit(
            EventDraft::new(
                EventType::SimulationCompleted,
                Severity::Success,
                format!(
                    "Simulation completed after {}s with {} requests",
                    self.config.duration_secs, self.system.total_requests
                ),
            )
            .meta("total_requests", self.system.total_requests)
            .meta("successful_requests", self.system.successful_requests)
            .meta("failed_requests", self.system.failed_requests),
        );
        self.result = Some(self.build_result());
        tracing::info!(
            total = self.system.total_requests,
            failed = self.system.failed_requests,
            "Simulation completed"
        );
    }

    // --- Tick processing ---

    /// Runs one fixed step of simulated time. No-op unless Running.
    pub fn tick(&mut self) {
        if self.status != SimulationStatus::Running {
            return;
        }

        self.current_time += self.config.tick_rate_ms;

        self.generate_requests();
        self.process_requests();
        self.active_requests
            .retain(|request| !request.status.is_terminal());
        self.refresh_system_metrics();

        if self.config.auto_scaling {
            self.run_autoscaler();
        }
        if self.config.chaos_mode {
            self.inject_chaos();
        }
        if self.current_time % SNAPSHOT_INTERVAL_MS == 0 {
            self.record_snapshot();
        }

        self.metrics_observers.notify(&self.system);

        tracing::trace!(
            time_ms = self.current_time,
            active = self.active_requests.len(),
            total = self.system.total_requests,
            "Tick processed"
        );

        if self.current_time >= self.config.duration_ms() {
            self.complete();
        }
    }

    fn generate_requests(&mut self) {
        let tick = self.config.tick_rate_ms as f64;
        let expected = self.config.requests_per_second * tick / 1000.0;
        let count = self.rng.stochastic_round(expected);

        for _ in 0..count {
            let Some(client) = self.rng.choose(self.topology.senders()).cloned() else {
                tracing::trace!("No client with outgoing edges, skipping generation");
                return;
            };
            let Some(target) = self.rng.choose(self.topology.targets(&client)).cloned() else {
                continue;
            };

            let id = format!("req-{}", self.next_request_id);
            self.next_request_id += 1;

            // Latency is measured from the start of the generating tick
            let start_time = self.current_time - self.config.tick_rate_ms;
            let request =
                ActiveRequest::new(id, &client, &target, start_time, self.config.payload_size_kb);
            self.system.total_requests += 1;

            self.emit(
                EventDraft::new(
                    EventType::RequestSent,
                    Severity::Info,
                    format!("Request {} sent from {client} to {target}", request.id),
                )
                .node(client.clone())
                .source_path(vec![client])
                .target_path(vec![target])
                .meta("request_id", request.id.clone())
                .meta("payload_kb", request.payload_kb),
            );
            self.active_requests.push(request);
        }
    }

    fn process_requests(&mut self) {
        let mut requests = std::mem::take(&mut self.active_requests);
        for request in requests
            .iter_mut()
            .filter(|request| !request.status.is_terminal())
        {
            self.advance_request(request);
        }
        self.active_requests = requests;
    }

    fn advance_request(&mut self, request: &mut ActiveRequest) {
        let previous = request.previous_node().to_string();

        let Some(target_type) = self.topology.node_type(&request.target_node_id) else {
            self.fail_unroutable(request, &previous);
            return;
        };

        let network = match self.topology.node_type(&previous) {
            Some(previous_type) => self.config.network_latency.latency(previous_type, target_type),
            None => self.config.network_latency.fallback_ms(),
        };
        let hop_latency = network + processing_latency(target_type, &self.config);

        if request.advance(self.config.tick_rate_ms as f64, hop_latency) {
            self.resolve_hop(request, &previous, target_type);
        }
    }

    /// Handles a request whose current hop just finished at its target.
    fn resolve_hop(&mut self, request: &mut ActiveRequest, previous: &str, target_type: NodeType) {
        let target = request.target_node_id.clone();
        let observed = request.current_latency;
        request.path.push(target.clone());

        let failed = self.rng.random_bool(self.config.error_rate);
        self.edge_metrics
            .entry(edge_key(previous, &target))
            .or_default()
            .record_hop(observed, failed);
        self.release_from_queue(previous, &request.id);

        if failed {
            if let Some(metrics) = self.node_metrics.get_mut(&target) {
                metrics.record_failure();
            }
            request.status = RequestStatus::Failed;
            self.system.failed_requests += 1;
            self.emit(
                EventDraft::new(
                    EventType::RequestFailed,
                    Severity::Error,
                    format!("Request {} failed at {target}", request.id),
                )
                .node(target)
                .source_path(request.path.clone())
                .meta("request_id", request.id.clone()),
            );
            return;
        }

        let drafts = match self.node_metrics.get_mut(&target) {
            Some(metrics) => {
                metrics.record_success(observed);
                processing::process_arrival(
                    &target,
                    target_type,
                    &request.id,
                    metrics,
                    &self.config,
                    &mut self.rng,
                    self.current_time,
                )
            }
            None => Vec::new(),
        };
        for draft in drafts {
            self.emit(draft);
        }

        let next = find_next_hop(&self.topology, &target, request, self.routing.as_ref())
            .map(str::to_string);

        match next {
            Some(next) => {
                request.retarget(&next);
                self.emit(
                    EventDraft::new(
                        EventType::RequestProcessed,
                        Severity::Info,
                        format!("Request {} processed at {target}, forwarding to {next}", request.id),
                    )
                    .node(target.clone())
                    .source_path(request.path.clone())
                    .target_path(vec![target, next])
                    .meta("request_id", request.id.clone()),
                );
            }
            None => {
                request.status = RequestStatus::Completed;
                request.progress = 1.0;
                let latency = request.elapsed(self.current_time);
                self.system.record_completion(latency);
                self.emit(
                    EventDraft::new(
                        EventType::RequestCompleted,
                        Severity::Success,
                        format!(
                            "Request {} completed in {latency:.0}ms via {}",
                            request.id,
                            request.path.join(" -> ")
                        ),
                    )
                    .node(target)
                    .source_path(request.path.clone())
                    .meta("request_id", request.id.clone())
                    .meta("latency_ms", latency),
                );
            }
        }
    }

    /// Fails a request whose target is not part of the graph.
    fn fail_unroutable(&mut self, request: &mut ActiveRequest, previous: &str) {
        let target = request.target_node_id.clone();
        request.status = RequestStatus::Failed;
        self.system.failed_requests += 1;
        self.edge_metrics
            .entry(edge_key(previous, &target))
            .or_default()
            .record_hop(request.current_latency, true);
        self.release_from_queue(previous, &request.id);

        tracing::warn!(request = %request.id, %target, "Request targets unknown node");
        self.emit(
            EventDraft::new(
                EventType::RequestFailed,
                Severity::Error,
                format!(
                    "Request {} failed: target node {target} does not exist",
                    request.id
                ),
            )
            .source_path(request.path.clone())
            .target_path(vec![target])
            .meta("request_id", request.id.clone()),
        );
    }

    /// Dequeues a message from `node_id` if it is a queue the request just left.
    ///
    /// Only with `drain_queues`; otherwise queue depth only grows.
    fn release_from_queue(&mut self, node_id: &str, request_id: &str) {
        if !self.config.drain_queues
            || self.topology.node_type(node_id) != Some(NodeType::Queue)
        {
            return;
        }
        let Some(metrics) = self.node_metrics.get_mut(node_id) else {
            return;
        };
        metrics.queue_depth = metrics.queue_depth.saturating_sub(1);
        let depth = metrics.queue_depth;

        self.emit(
            EventDraft::new(
                EventType::QueueDequeue,
                Severity::Info,
                format!("Message {request_id} dequeued from {node_id} (depth {depth})"),
            )
            .node(node_id)
            .meta("queue_depth", depth),
        );
    }

    fn refresh_system_metrics(&mut self) {
        self.system.active_requests = self.active_requests.len();
        self.system.total_queue_depth = self
            .node_metrics
            .values()
            .map(|metrics| metrics.queue_depth)
            .sum();
        self.system.refresh_rates(self.current_time);
    }

    fn run_autoscaler(&mut self) {
        let mut drafts = Vec::new();
        for node in self.topology.nodes() {
            if node.node_type != NodeType::Service {
                continue;
            }
            let Some(metrics) = self.node_metrics.get_mut(&node.id) else {
                continue;
            };
            if let Some((decision, draft)) = scaling::evaluate(&node.id, metrics) {
                tracing::debug!(node = %node.id, ?decision, instances = metrics.instances, "Scaled");
                self.system.scaling_actions += 1;
                drafts.push(draft);
            }
        }
        for draft in drafts {
            self.emit(draft);
        }
    }

    fn inject_chaos(&mut self) {
        if !self.chaos_rng.random_bool(CHAOS_OVERLOAD_PROBABILITY) {
            return;
        }
        let Some(node) = self.chaos_rng.choose(self.topology.nodes()).cloned() else {
            return;
        };
        self.emit(
            EventDraft::new(
                EventType::NodeOverloaded,
                Severity::Warning,
                format!("Chaos: {} is experiencing an overload spike", node.label),
            )
            .node(node.id)
            .meta("chaos", true),
        );
    }

    fn record_snapshot(&mut self) {
        self.history.push(MetricsSnapshot {
            timestamp: self.current_time,
            system: self.system.clone(),
            nodes: self.node_metrics.clone(),
            edges: self.edge_metrics.clone(),
        });
    }

    fn emit(&mut self, draft: EventDraft) {
        let event = self.events.append(draft, self.current_time).clone();
        tracing::trace!(event = event.event_type.as_str(), message = %event.message);
        self.event_observers.notify(&event);
    }

    // --- Results ---

    fn build_result(&self) -> SimulationResult {
        let bottlenecks = analysis::detect_bottlenecks(
            &self.topology,
            |id| self.node_metrics.get(id),
            &self.config,
        );
        let recommendations = analysis::global_recommendations(&self.topology, &bottlenecks);
        let summary =
            analysis::summarize(&self.system, &self.history, bottlenecks, recommendations);

        SimulationResult {
            run_id: self.run_id,
            seed: self.rng.seed(),
            status: self.status,
            finished_at: Utc::now(),
            config: self.config.clone(),
            duration: self.current_time as f64 / 1000.0,
            metrics_history: self.history.clone(),
            events: self.events.events().to_vec(),
            summary,
        }
    }

    /// Returns the run's result.
    ///
    /// Once stopped or completed this is the result synthesized at that
    /// moment; before then it is a best-effort view of the current state.
    pub fn result(&self) -> SimulationResult {
        match &self.result {
            Some(result) => result.clone(),
            None => self.build_result(),
        }
    }

    /// Copies the current state for inspection.
    pub fn state(&self) -> SimulationState {
        SimulationState {
            status: self.status,
            config: self.config.clone(),
            current_time: self.current_time,
            speed: self.config.speed,
            active_requests: self.active_requests.clone(),
            node_metrics: self.node_metrics.clone(),
            edge_metrics: self.edge_metrics.clone(),
            system_metrics: self.system.clone(),
            events: self.events.events().to_vec(),
            metrics_history: self.history.clone(),
        }
    }

    // --- Subscriptions ---

    /// Registers a callback for every emitted event.
    pub fn on_event<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SimulationEvent) + Send + Sync + 'static,
    {
        self.event_observers.subscribe(callback)
    }

    /// Registers a callback for the system metrics published each tick.
    pub fn on_metrics_update<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SystemMetrics) + Send + Sync + 'static,
    {
        self.metrics_observers.subscribe(callback)
    }

    pub(crate) fn event_observers(&self) -> Observers<SimulationEvent> {
        self.event_observers.clone()
    }

    pub(crate) fn metrics_observers(&self) -> Observers<SystemMetrics> {
        self.metrics_observers.clone()
    }

    // --- Accessors ---

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Simulated time in milliseconds.
    pub fn current_time(&self) -> u64 {
        self.current_time
    }

    pub fn speed(&self) -> f64 {
        self.config.speed
    }

    /// Wall-clock interval between ticks at the current speed, capped at one day.
    pub fn tick_interval(&self) -> Duration {
        let seconds = self.config.tick_rate_ms as f64 / 1000.0 / self.config.speed;
        Duration::try_from_secs_f64(seconds)
            .unwrap_or(MAX_TICK_INTERVAL)
            .min(MAX_TICK_INTERVAL)
    }

    /// Number of ticks a full run takes.
    pub fn tick_budget(&self) -> u64 {
        self.config.duration_ms().div_ceil(self.config.tick_rate_ms)
    }

    pub fn system_metrics(&self) -> &SystemMetrics {
        &self.system
    }

    pub fn node_metrics(&self, node_id: &str) -> Option<&NodeMetrics> {
        self.node_metrics.get(node_id)
    }

    pub fn edge_metrics(&self, source: &str, target: &str) -> Option<&EdgeMetrics> {
        self.edge_metrics.get(&edge_key(source, target))
    }

    pub fn active_requests(&self) -> &[ActiveRequest] {
        &self.active_requests
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn metrics_history(&self) -> &[MetricsSnapshot] {
        &self.history
    }
}
