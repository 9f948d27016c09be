//! Adjacency index over the architecture, built once per engine.

use std::collections::HashMap;

use archsim_core::{Architecture, Node, NodeType};

/// Lookup tables derived from an architecture snapshot.
#[derive(Debug, Clone)]
pub struct Topology {
    architecture: Architecture,
    index: HashMap<String, usize>,
    adjacency: HashMap<String, Vec<String>>,
    senders: Vec<String>,
}

impl Topology {
    /// Indexes the graph. Edge order is preserved per source node.
    ///
    /// Self-loops are dropped: a request never re-enters the node it is at.
    pub fn new(architecture: Architecture) -> Self {
        let mut index = HashMap::with_capacity(architecture.nodes.len());
        for (position, node) in architecture.nodes.iter().enumerate() {
            // First declaration wins for duplicated ids
            index.entry(node.id.clone()).or_insert(position);
        }

        let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
        for edge in &architecture.edges {
            if edge.source == edge.target {
                tracing::debug!(node = %edge.source, "Ignoring self-loop");
                continue;
            }
            adjacency
                .entry(edge.source.clone())
                .or_default()
                .push(edge.target.clone());
        }

        let senders = architecture
            .nodes
            .iter()
            .filter(|node| node.node_type == NodeType::Client)
            .filter(|node| adjacency.get(&node.id).is_some_and(|targets| !targets.is_empty()))
            .map(|node| node.id.clone())
            .collect();

        Self {
            architecture,
            index,
            adjacency,
            senders,
        }
    }

    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> &[Node] {
        &self.architecture.nodes
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&position| &self.architecture.nodes[position])
    }

    pub fn node_type(&self, id: &str) -> Option<NodeType> {
        self.node(id).map(|node| node.node_type)
    }

    /// Targets of edges leaving `id`, in declaration order.
    pub fn targets(&self, id: &str) -> &[String] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// CLIENT nodes with at least one outgoing edge.
    pub fn senders(&self) -> &[String] {
        &self.senders
    }

    pub fn has_node_type(&self, node_type: NodeType) -> bool {
        self.architecture.has_node_type(node_type)
    }
}

#[cfg(test)]
mod tests {
    use archsim_core::Edge;

    use super::*;

    #[test]
    fn test_senders_exclude_isolated_clients() {
        let topology = Topology::new(Architecture::new(
            vec![
                Node::new("web", NodeType::Client),
                Node::new("batch", NodeType::Client),
                Node::new("api", NodeType::Service),
            ],
            vec![Edge::new("web", "api")],
        ));

        assert_eq!(topology.senders(), ["web".to_string()]);
        assert!(topology.targets("batch").is_empty());
        assert_eq!(topology.node_type("api"), Some(NodeType::Service));
        assert_eq!(topology.node_type("ghost"), None);
    }

    #[test]
    fn test_targets_keep_edge_order() {
        let topology = Topology::new(Architecture::new(
            vec![
                Node::new("lb", NodeType::LoadBalancer),
                Node::new("a", NodeType::Service),
                Node::new("b", NodeType::Service),
            ],
            vec![Edge::new("lb", "b"), Edge::new("lb", "a")],
        ));

        assert_eq!(topology.targets("lb"), ["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_self_loops_are_not_routable() {
        let topology = Topology::new(Architecture::new(
            vec![Node::new("web", NodeType::Client)],
            vec![Edge::new("web", "web")],
        ));

        assert!(topology.targets("web").is_empty());
        assert!(topology.senders().is_empty());
    }
}
