//! Architecture graph consumed by the simulation engine.
//!
//! The graph is a flat list of typed nodes plus directed edges. Cycles are
//! allowed; the engine defends against them per request.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors raised while loading or validating an architecture file.
#[derive(Debug, thiserror::Error)]
pub enum ArchitectureError {
    #[error("Failed to read architecture file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse architecture: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Architecture has no nodes")]
    Empty,

    #[error("Duplicate node id: {id}")]
    DuplicateNode { id: String },

    #[error("Edge {source_id}->{target_id} references unknown node {missing}")]
    DanglingEdge {
        source_id: String,
        target_id: String,
        missing: String,
    },

    #[error("Edge on node {id} points back at itself")]
    SelfLoop { id: String },
}

/// Component kind of a node. Drives all behavioral dispatch in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Client,
    ApiGateway,
    LoadBalancer,
    Service,
    Database,
    Cache,
    Queue,
    Pubsub,
    ObjectStorage,
    Metrics,
    RateLimiter,
    Cdn,
}

impl NodeType {
    /// All recognized node types in declaration order.
    pub const ALL: [NodeType; 12] = [
        NodeType::Client,
        NodeType::ApiGateway,
        NodeType::LoadBalancer,
        NodeType::Service,
        NodeType::Database,
        NodeType::Cache,
        NodeType::Queue,
        NodeType::Pubsub,
        NodeType::ObjectStorage,
        NodeType::Metrics,
        NodeType::RateLimiter,
        NodeType::Cdn,
    ];

    /// Returns the wire label used in architecture files and latency tables.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Client => "CLIENT",
            NodeType::ApiGateway => "API_GATEWAY",
            NodeType::LoadBalancer => "LOAD_BALANCER",
            NodeType::Service => "SERVICE",
            NodeType::Database => "DATABASE",
            NodeType::Cache => "CACHE",
            NodeType::Queue => "QUEUE",
            NodeType::Pubsub => "PUBSUB",
            NodeType::ObjectStorage => "OBJECT_STORAGE",
            NodeType::Metrics => "METRICS",
            NodeType::RateLimiter => "RATE_LIMITER",
            NodeType::Cdn => "CDN",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A component placed in the architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier
    pub id: String,
    /// Component kind
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Display label
    #[serde(default)]
    pub label: String,
}

impl Node {
    /// Creates a node whose label defaults to its id.
    pub fn new(id: impl Into<String>, node_type: NodeType) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            node_type,
        }
    }

    /// Replaces the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Key used for per-edge metrics maps.
    pub fn key(&self) -> String {
        edge_key(&self.source, &self.target)
    }
}

/// Formats the metrics key for the edge `source -> target`.
pub fn edge_key(source: &str, target: &str) -> String {
    format!("{source}->{target}")
}

/// Graph snapshot handed to the simulation engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Architecture {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Parses an architecture from JSON text.
    ///
    /// # Errors
    ///
    /// - `ArchitectureError::Parse` - Malformed JSON or unknown node type
    pub fn from_json_str(json: &str) -> Result<Self, ArchitectureError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads an architecture from a JSON file.
    ///
    /// # Errors
    ///
    /// - `ArchitectureError::Io` - File cannot be read
    /// - `ArchitectureError::Parse` - Malformed JSON or unknown node type
    pub fn load(path: &Path) -> Result<Self, ArchitectureError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Looks up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Returns true if any node has the given type.
    pub fn has_node_type(&self, node_type: NodeType) -> bool {
        self.nodes.iter().any(|node| node.node_type == node_type)
    }

    /// Iterates over edges leaving `id`, in declaration order.
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.source == id)
    }

    /// Checks structural soundness of the graph.
    ///
    /// Returns warnings for conditions the engine tolerates but that keep it
    /// from producing traffic.
    ///
    /// # Errors
    ///
    /// - `ArchitectureError::Empty` - No nodes
    /// - `ArchitectureError::DuplicateNode` - Two nodes share an id
    /// - `ArchitectureError::DanglingEdge` - Edge endpoint is not a node
    /// - `ArchitectureError::SelfLoop` - Edge source equals its target
    pub fn validate(&self) -> Result<Vec<String>, ArchitectureError> {
        if self.nodes.is_empty() {
            return Err(ArchitectureError::Empty);
        }

        let mut ids = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(ArchitectureError::DuplicateNode {
                    id: node.id.clone(),
                });
            }
        }

        for edge in &self.edges {
            if edge.source == edge.target {
                return Err(ArchitectureError::SelfLoop {
                    id: edge.source.clone(),
                });
            }
            for endpoint in [&edge.source, &edge.target] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(ArchitectureError::DanglingEdge {
                        source_id: edge.source.clone(),
                        target_id: edge.target.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
        }

        let mut warnings = Vec::new();
        let clients: Vec<&Node> = self
            .nodes
            .iter()
            .filter(|node| node.node_type == NodeType::Client)
            .collect();

        if clients.is_empty() {
            warnings.push("No CLIENT node: no traffic will be generated".to_string());
        }
        for client in clients {
            if self.outgoing(&client.id).next().is_none() {
                warnings.push(format!(
                    "Client {} has no outgoing connections and will never send requests",
                    client.id
                ));
            }
        }

        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Architecture {
        Architecture::new(
            vec![
                Node::new("web", NodeType::Client),
                Node::new("api", NodeType::Service),
                Node::new("db", NodeType::Database),
            ],
            vec![Edge::new("web", "api"), Edge::new("api", "db")],
        )
    }

    #[test]
    fn test_parse_wire_format() {
        let json = r#"{
            "nodes": [
                {"id": "c", "type": "CLIENT", "label": "Browser"},
                {"id": "gw", "type": "API_GATEWAY"}
            ],
            "edges": [{"source": "c", "target": "gw"}]
        }"#;

        let arch = Architecture::from_json_str(json).unwrap();
        assert_eq!(arch.nodes[0].node_type, NodeType::Client);
        assert_eq!(arch.nodes[0].label, "Browser");
        assert_eq!(arch.nodes[1].node_type, NodeType::ApiGateway);
        assert_eq!(arch.edges.len(), 1);
    }

    #[test]
    fn test_unknown_node_type_rejected() {
        let json = r#"{"nodes": [{"id": "x", "type": "MAINFRAME"}]}"#;
        assert!(matches!(
            Architecture::from_json_str(json),
            Err(ArchitectureError::Parse(_))
        ));
    }

    #[test]
    fn test_validate_accepts_sound_graph() {
        let warnings = sample().validate().unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_validate_rejects_duplicates_and_dangling_edges() {
        let mut arch = sample();
        arch.nodes.push(Node::new("db", NodeType::Cache));
        assert!(matches!(
            arch.validate(),
            Err(ArchitectureError::DuplicateNode { .. })
        ));

        let mut arch = sample();
        arch.edges.push(Edge::new("api", "ghost"));
        match arch.validate() {
            Err(ArchitectureError::DanglingEdge { missing, .. }) => assert_eq!(missing, "ghost"),
            other => panic!("expected dangling edge, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_warns_on_isolated_client() {
        let mut arch = sample();
        arch.nodes.push(Node::new("mobile", NodeType::Client));
        let warnings = arch.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("mobile"));
    }

    #[test]
    fn test_node_type_labels_round_trip_through_serde() {
        for node_type in NodeType::ALL {
            let json = serde_json::to_string(&node_type).unwrap();
            assert_eq!(json, format!("\"{}\"", node_type.as_str()));
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arch.json");
        std::fs::write(&path, serde_json::to_string(&sample()).unwrap()).unwrap();

        let loaded = Architecture::load(&path).unwrap();
        assert_eq!(loaded, sample());
    }
}
