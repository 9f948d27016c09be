//! Feedback-driven instance scaling for SERVICE nodes.
//!
//! Thresholds are fixed policy, not configuration. There is no cooldown: a
//! node whose utilization swings across both thresholds on adjacent ticks
//! scales up and down on adjacent ticks.

use archsim_core::{EventDraft, EventType, NodeMetrics, Severity};

/// Utilization above which a service gains an instance.
pub const SCALE_UP_THRESHOLD: f64 = 0.8;

/// Utilization below which a service loses an instance.
pub const SCALE_DOWN_THRESHOLD: f64 = 0.3;

pub const MIN_INSTANCES: u32 = 1;
pub const MAX_INSTANCES: u32 = 10;

/// Utilization multiplier applied after adding an instance.
const SCALE_UP_DAMPENING: f64 = 0.8;

/// Utilization multiplier applied after removing an instance.
const SCALE_DOWN_INFLATION: f64 = 1.2;

/// Direction of a scaling action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingDecision {
    Up,
    Down,
}

/// Evaluates one service node and applies at most one scaling step.
///
/// Returns the decision taken and the event describing it.
pub fn evaluate(node_id: &str, metrics: &mut NodeMetrics) -> Option<(ScalingDecision, EventDraft)> {
    if metrics.cpu_utilization > SCALE_UP_THRESHOLD && metrics.instances < MAX_INSTANCES {
        let previous = metrics.instances;
        metrics.instances += 1;
        metrics.cpu_utilization *= SCALE_UP_DAMPENING;

        let event = EventDraft::new(
            EventType::NodeScaled,
            Severity::Success,
            format!(
                "Scaled up {node_id} from {previous} to {} instances",
                metrics.instances
            ),
        )
        .node(node_id)
        .meta("direction", "up")
        .meta("instances", metrics.instances);
        return Some((ScalingDecision::Up, event));
    }

    if metrics.cpu_utilization < SCALE_DOWN_THRESHOLD && metrics.instances > MIN_INSTANCES {
        let previous = metrics.instances;
        metrics.instances -= 1;
        metrics.cpu_utilization = (metrics.cpu_utilization * SCALE_DOWN_INFLATION).min(1.0);

        let event = EventDraft::new(
            EventType::NodeScaled,
            Severity::Info,
            format!(
                "Scaled down {node_id} from {previous} to {} instances",
                metrics.instances
            ),
        )
        .node(node_id)
        .meta("direction", "down")
        .meta("instances", metrics.instances);
        return Some((ScalingDecision::Down, event));
    }

    None
}
