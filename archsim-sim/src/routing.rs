//! Next-hop selection.

use crate::request::ActiveRequest;
use crate::topology::Topology;

/// Picks the next hop among unvisited neighbours of the current node.
pub trait RoutingStrategy: Send + Sync + std::fmt::Debug {
    /// Returns one of `candidates`, or `None` to end the request here.
    ///
    /// `candidates` is never empty and never contains visited nodes.
    fn select<'a>(&self, candidates: &[&'a str], request: &ActiveRequest) -> Option<&'a str>;
}

/// Takes the first unvisited outgoing edge in declaration order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstUnvisited;

impl RoutingStrategy for FirstUnvisited {
    fn select<'a>(&self, candidates: &[&'a str], _request: &ActiveRequest) -> Option<&'a str> {
        candidates.first().copied()
    }
}

/// Finds the next hop for `request`, which has just arrived at `current`.
///
/// Targets already in the request's path are excluded, so a request never
/// revisits a node even when the graph has cycles. Returns `None` when the
/// request terminates at `current`.
pub fn find_next_hop<'t>(
    topology: &'t Topology,
    current: &str,
    request: &ActiveRequest,
    strategy: &dyn RoutingStrategy,
) -> Option<&'t str> {
    let candidates: Vec<&str> = topology
        .targets(current)
        .iter()
        .map(String::as_str)
        .filter(|target| !request.has_visited(target))
        .collect();

    if candidates.is_empty() {
        return None;
    }
    strategy.select(&candidates, request)
}

#[cfg(test)]
mod tests {
    use archsim_core::{Architecture, Edge, Node, NodeType};

    use super::*;

    fn cyclic() -> Topology {
        Topology::new(Architecture::new(
            vec![
                Node::new("client", NodeType::Client),
                Node::new("a", NodeType::Service),
                Node::new("b", NodeType::Service),
                Node::new("c", NodeType::Database),
            ],
            vec![
                Edge::new("client", "a"),
                Edge::new("a", "b"),
                Edge::new("b", "a"),
                Edge::new("b", "c"),
            ],
        ))
    }

    #[test]
    fn test_first_unvisited_edge_wins() {
        let topology = cyclic();
        let mut request = ActiveRequest::new("r".into(), "client", "a", 0, 1.0);
        request.path.push("a".into());

        assert_eq!(find_next_hop(&topology, "a", &request, &FirstUnvisited), Some("b"));
    }

    #[test]
    fn test_visited_targets_skipped() {
        let topology = cyclic();
        let mut request = ActiveRequest::new("r".into(), "client", "a", 0, 1.0);
        request.path.extend(["a".to_string(), "b".to_string()]);

        // b -> a is a back edge; c is the only unvisited option
        assert_eq!(find_next_hop(&topology, "b", &request, &FirstUnvisited), Some("c"));

        request.path.push("c".into());
        assert_eq!(find_next_hop(&topology, "c", &request, &FirstUnvisited), None);
    }

    #[test]
    fn test_custom_strategy_receives_only_unvisited() {
        #[derive(Debug)]
        struct Last;
        impl RoutingStrategy for Last {
            fn select<'a>(&self, candidates: &[&'a str], request: &ActiveRequest) -> Option<&'a str> {
                assert!(candidates.iter().all(|c| !request.has_visited(c)));
                candidates.last().copied()
            }
        }

        let topology = cyclic();
        let mut request = ActiveRequest::new("r".into(), "client", "a", 0, 1.0);
        request.path.extend(["a".to_string(), "b".to_string()]);
        assert_eq!(find_next_hop(&topology, "b", &request, &Last), Some("c"));
    }
}
