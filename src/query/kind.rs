use std::fmt;

use serde::{Deserialize, Serialize};

// Node types (matching the editor's node type names)
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum NodeKind {
    #[serde(rename = "streamNode")]
    Stream,
    #[serde(rename = "enumNode")]
    Enum,
    #[serde(rename = "selectNode")]
    Select,
    #[serde(rename = "projectNode")]
    Project,
    #[serde(rename = "joinNode")]
    Join,
    #[serde(rename = "groupByNode")]
    GroupBy,
    #[serde(rename = "aggregateNode")]
    Aggregate,
}

impl NodeKind {
    pub const QUERY_KINDS: [NodeKind; 6] = [
        NodeKind::Stream,
        NodeKind::Select,
        NodeKind::Project,
        NodeKind::Join,
        NodeKind::GroupBy,
        NodeKind::Aggregate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Stream => "streamNode",
            NodeKind::Enum => "enumNode",
            NodeKind::Select => "selectNode",
            NodeKind::Project => "projectNode",
            NodeKind::Join => "joinNode",
            NodeKind::GroupBy => "groupByNode",
            NodeKind::Aggregate => "aggregateNode",
        }
    }

    /// Kinds that can live in a query graph
    pub fn is_query_node(&self) -> bool {
        !matches!(self, NodeKind::Enum)
    }

    /// Whether a node of this kind may read from a node of kind `upstream`
    pub fn accepts(&self, upstream: NodeKind) -> bool {
        match self {
            NodeKind::Select => upstream == NodeKind::Stream,
            NodeKind::Project | NodeKind::Join | NodeKind::GroupBy | NodeKind::Aggregate => {
                matches!(
                    upstream,
                    NodeKind::Select | NodeKind::Join | NodeKind::GroupBy | NodeKind::Aggregate
                )
            }
            NodeKind::Stream | NodeKind::Enum => false,
        }
    }

    /// Input ports of this kind, in display order
    pub fn ports(&self) -> &'static [Port] {
        match self {
            NodeKind::Select | NodeKind::Project | NodeKind::GroupBy | NodeKind::Aggregate => {
                &[Port::In]
            }
            NodeKind::Join => &[Port::Left, Port::Right],
            NodeKind::Stream | NodeKind::Enum => &[],
        }
    }

    pub fn has_port(&self, port: Port) -> bool {
        self.ports().contains(&port)
    }

    /// Display tier written next to each node in persisted documents
    pub fn level(&self) -> u32 {
        match self {
            NodeKind::Stream | NodeKind::Enum => 1,
            NodeKind::Select => 2,
            NodeKind::Join | NodeKind::GroupBy | NodeKind::Aggregate => 3,
            NodeKind::Project => 4,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input port of a consuming node
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum Port {
    In,
    Left,
    Right,
}

impl Port {
    pub fn as_str(&self) -> &'static str {
        match self {
            Port::In => "in",
            Port::Left => "left",
            Port::Right => "right",
        }
    }

    /// Resolve a persisted handle id for a consumer of `kind`.
    ///
    /// Only a join tells its inputs apart: `left`/`b` and `right`/`c`.
    /// Single-input kinds take whatever handle id they were saved with
    /// (`in`, `b`, or `a` as written for project nodes).
    pub fn resolve(kind: NodeKind, handle: &str) -> Option<Port> {
        let port = match (kind, handle) {
            (NodeKind::Join, "left" | "b") => Port::Left,
            (NodeKind::Join, "right" | "c") => Port::Right,
            (NodeKind::Join, _) => return None,
            _ => Port::In,
        };
        kind.has_port(port).then_some(port)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Port::In => "input",
            Port::Left => "left",
            Port::Right => "right",
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_whitelist() {
        assert!(NodeKind::Select.accepts(NodeKind::Stream));
        assert!(!NodeKind::Select.accepts(NodeKind::Select));
        assert!(!NodeKind::Project.accepts(NodeKind::Stream));
        for consumer in [
            NodeKind::Project,
            NodeKind::Join,
            NodeKind::GroupBy,
            NodeKind::Aggregate,
        ] {
            assert!(consumer.accepts(NodeKind::Select));
            assert!(consumer.accepts(NodeKind::Join));
            assert!(consumer.accepts(NodeKind::GroupBy));
            assert!(consumer.accepts(NodeKind::Aggregate));
            assert!(!consumer.accepts(NodeKind::Project));
        }
        for upstream in NodeKind::QUERY_KINDS {
            assert!(!NodeKind::Stream.accepts(upstream));
        }
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&NodeKind::GroupBy).unwrap(),
            "\"groupByNode\""
        );
        let kind: NodeKind = serde_json::from_str("\"aggregateNode\"").unwrap();
        assert_eq!(kind, NodeKind::Aggregate);
        assert_eq!(NodeKind::Join.to_string(), "joinNode");
    }

    #[test]
    fn test_legacy_handles() {
        assert_eq!(Port::resolve(NodeKind::Join, "b"), Some(Port::Left));
        assert_eq!(Port::resolve(NodeKind::Join, "c"), Some(Port::Right));
        assert_eq!(Port::resolve(NodeKind::Join, "in"), None);
        assert_eq!(Port::resolve(NodeKind::Select, "b"), Some(Port::In));
        assert_eq!(Port::resolve(NodeKind::Project, "a"), Some(Port::In));
        assert_eq!(Port::resolve(NodeKind::Aggregate, "c"), Some(Port::In));
        assert_eq!(Port::resolve(NodeKind::Stream, "in"), None);
    }
}
