//! Query graph assembly
//!
//! [`QueryGraph`] owns every query node editor in an insertion-ordered arena
//! keyed by node id, plus the edges between them. Edges point from the
//! consuming node to the upstream node it reads (`source` consumes `target`
//! in persisted documents). The graph is the only place that resolves
//! upstream ids: whenever a node finishes, connects or disappears, the
//! affected consumers receive fresh [`Input`] snapshots in topological order.
//!
//! # Examples
//!
//! ```rust
//! use mlndash::document::Position;
//! use mlndash::entity::{Catalog, StreamDecl};
//! use mlndash::graph::QueryGraph;
//! use mlndash::model::{Attribute, PrimitiveType};
//! use mlndash::query::{NodeKind, Port};
//!
//! let orders = StreamDecl::new(
//!     "Orders",
//!     vec![Attribute::new("amount", PrimitiveType::Float.into())],
//! );
//! let mut graph = QueryGraph::new(Catalog::new(vec![orders], Vec::new()));
//!
//! let stream = graph.add_node(NodeKind::Stream, Position::default()).unwrap();
//! let select = graph.add_node(NodeKind::Select, Position::new(0.0, 120.0)).unwrap();
//! graph.choose_stream(&stream, "Orders").unwrap();
//! graph.finish(&stream).unwrap();
//! graph.connect(&select, Port::In, &stream).unwrap();
//!
//! // self loops are rejected
//! assert!(graph.can_connect(&select, Port::In, &select).is_err());
//! ```

pub mod topo;

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::document::{DocEdge, DocNode, EntitiesDoc, EntityKind, Position, QueryDoc};
use crate::entity::Catalog;
use crate::errors::{ConnectionError, GraphError, GraphResult, ValidationIssue};
use crate::model::validate_identifier;
use crate::query::{Clause, Input, NodeEditor, NodeKind, Port, QueryNode};

/// Edge from a consuming node's port to the node it reads
#[derive(Clone, Debug, PartialEq)]
pub struct GraphEdge {
    pub id: Option<String>,
    pub consumer: String,
    pub port: Port,
    pub upstream: String,
    // Handles as persisted, written back unchanged
    source_handle: Option<String>,
    target_handle: Option<String>,
}

impl GraphEdge {
    fn new(consumer: &str, port: Port, upstream: &str) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            consumer: consumer.to_string(),
            port,
            upstream: upstream.to_string(),
            source_handle: Some(port.as_str().to_string()),
            target_handle: None,
        }
    }

    fn to_doc(&self) -> DocEdge {
        DocEdge {
            id: self.id.clone(),
            source: self.consumer.clone(),
            source_handle: self.source_handle.clone(),
            target: self.upstream.clone(),
            target_handle: self.target_handle.clone(),
        }
    }
}

#[derive(Clone, Debug)]
struct GraphNode {
    node: QueryNode,
    position: Position,
}

/// The live query graph of one query editor
#[derive(Clone, Debug)]
pub struct QueryGraph {
    catalog: Catalog,
    query_name: String,
    read_only_name: bool,
    nodes: IndexMap<String, GraphNode>,
    edges: Vec<GraphEdge>,
}

impl QueryGraph {
    /// Empty graph over a catalog snapshot
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            query_name: String::new(),
            read_only_name: false,
            nodes: IndexMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn query_name(&self) -> &str {
        &self.query_name
    }

    /// True for graphs reconstructed from a stored query
    pub fn has_read_only_name(&self) -> bool {
        self.read_only_name
    }

    /// Rename the query; validated when the graph is serialized
    pub fn set_query_name(&mut self, name: impl Into<String>) -> Result<(), ValidationIssue> {
        let name = name.into();
        if self.read_only_name && name != self.query_name {
            return Err(ValidationIssue::ReadOnlyName(self.query_name.clone()));
        }
        self.query_name = name;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn node(&self, id: &str) -> Option<&QueryNode> {
        self.nodes.get(id).map(|n| &n.node)
    }

    /// Editing access; changes are published by [`QueryGraph::finish`]
    pub fn node_mut(&mut self, id: &str) -> Option<&mut QueryNode> {
        self.nodes.get_mut(id).map(|n| &mut n.node)
    }

    pub fn position(&self, id: &str) -> Option<Position> {
        self.nodes.get(id).map(|n| n.position)
    }

    pub fn move_node(&mut self, id: &str, position: Position) -> GraphResult<()> {
        let entry = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        entry.position = position;
        Ok(())
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Node feeding `port` of `consumer`
    pub fn upstream_of(&self, consumer: &str, port: Port) -> Option<&str> {
        self.edges
            .iter()
            .find(|e| e.consumer == consumer && e.port == port)
            .map(|e| e.upstream.as_str())
    }

    /// Nodes reading from `upstream`
    pub fn consumers_of<'a>(&'a self, upstream: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.upstream == upstream)
            .map(|e| e.consumer.as_str())
    }

    /// Add an empty node and return its id
    pub fn add_node(&mut self, kind: NodeKind, position: Position) -> GraphResult<String> {
        let node = QueryNode::new(kind).ok_or(GraphError::UnsupportedKind(kind))?;
        let id = Uuid::new_v4().to_string();
        self.nodes.insert(id.clone(), GraphNode { node, position });
        debug!(node = %id, kind = %kind, "Node added");
        Ok(id)
    }

    /// Point a stream node at a catalog stream
    pub fn choose_stream(&mut self, id: &str, stream: &str) -> GraphResult<()> {
        let entry = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        let kind = entry.node.kind();
        let editor = entry
            .node
            .as_stream_mut()
            .ok_or(GraphError::UnsupportedKind(kind))?;
        editor
            .choose_stream(&self.catalog, stream)
            .map_err(|issue| GraphError::NodeInvalid {
                node: id.to_string(),
                issues: vec![issue],
            })
    }

    /// Remove a node and exactly its incident edges; former consumers are
    /// recomputed along with everything downstream of them.
    pub fn remove_node(&mut self, id: &str) -> GraphResult<QueryNode> {
        let removed = self
            .nodes
            .shift_remove(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;

        let consumers: Vec<String> = self.consumers_of(id).map(str::to_string).collect();
        let before = self.edges.len();
        self.edges.retain(|e| e.consumer != id && e.upstream != id);
        debug!(
            node = id,
            edges_removed = before - self.edges.len(),
            "Node removed"
        );

        for consumer in consumers {
            self.wire(&consumer);
            self.propagate(&consumer);
        }
        Ok(removed.node)
    }

    /// Check a connection against the policy without touching the graph
    pub fn can_connect(
        &self,
        consumer: &str,
        port: Port,
        upstream: &str,
    ) -> Result<(), ConnectionError> {
        if consumer == upstream {
            return Err(ConnectionError::SelfLoop(consumer.to_string()));
        }
        let consumer_kind = self
            .kind_of(consumer)
            .ok_or_else(|| ConnectionError::UnknownNode(consumer.to_string()))?;
        let upstream_kind = self
            .kind_of(upstream)
            .ok_or_else(|| ConnectionError::UnknownNode(upstream.to_string()))?;

        if !consumer_kind.has_port(port) {
            return Err(ConnectionError::InvalidPort {
                kind: consumer_kind,
                port: port.to_string(),
            });
        }
        if !consumer_kind.accepts(upstream_kind) {
            return Err(ConnectionError::KindNotAccepted {
                consumer: consumer_kind,
                upstream: upstream_kind,
            });
        }
        if topo::reaches(consumer, upstream, self.flow_edges()) {
            return Err(ConnectionError::WouldCycle {
                consumer: consumer.to_string(),
                upstream: upstream.to_string(),
            });
        }
        Ok(())
    }

    /// Connect `port` of `consumer` to `upstream`, replacing any edge on that
    /// port, and recompute the consumer and its dependants.
    pub fn connect(&mut self, consumer: &str, port: Port, upstream: &str) -> GraphResult<()> {
        if let Err(err) = self.can_connect(consumer, port, upstream) {
            warn!(consumer, upstream, port = %port, error = %err, "Connection rejected");
            return Err(err.into());
        }

        self.edges
            .retain(|e| !(e.consumer == consumer && e.port == port));
        self.edges.push(GraphEdge::new(consumer, port, upstream));
        debug!(consumer, upstream, port = %port, "Nodes connected");

        self.wire(consumer);
        self.propagate(consumer);
        Ok(())
    }

    /// Drop the edge on `port` of `consumer`; returns whether one existed
    pub fn disconnect(&mut self, consumer: &str, port: Port) -> bool {
        let before = self.edges.len();
        self.edges
            .retain(|e| !(e.consumer == consumer && e.port == port));
        if self.edges.len() == before {
            return false;
        }
        self.wire(consumer);
        self.propagate(consumer);
        true
    }

    /// Finish node `id` and recompute everything downstream of it
    pub fn finish(&mut self, id: &str) -> GraphResult<Clause> {
        let entry = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        let clause = entry
            .node
            .editor_mut()
            .finish()
            .map_err(|issues| GraphError::NodeInvalid {
                node: id.to_string(),
                issues,
            })?;
        self.propagate(id);
        debug!(node = id, ready = self.is_commit_ready(), "Node finished");
        Ok(clause)
    }

    /// At least one node and every node complete
    pub fn is_commit_ready(&self) -> bool {
        !self.nodes.is_empty() && self.nodes.values().all(|n| n.node.editor().is_complete())
    }

    pub fn incomplete_nodes(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, n)| !n.node.editor().is_complete())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Node ids ordered so upstream nodes come first
    pub fn topological_order(&self) -> GraphResult<Vec<String>> {
        topo::topological_order(self.node_ids(), self.flow_edges())
            .map_err(|remaining| GraphError::CycleDetected(remaining.join(", ")))
    }

    /// Flatten the committed graph into a query document
    pub fn to_document(&self) -> GraphResult<QueryDoc> {
        validate_identifier(&self.query_name, "Query").map_err(GraphError::InvalidQueryName)?;
        if !self.is_commit_ready() {
            return Err(GraphError::NotCommitReady {
                incomplete: self.incomplete_nodes(),
            });
        }

        let mut nodes = Vec::with_capacity(self.nodes.len());
        for id in self.topological_order()? {
            let entry = &self.nodes[id.as_str()];
            let kind = entry.node.kind();
            let clause = entry.node.editor().state().clause().cloned().ok_or_else(|| {
                GraphError::NotCommitReady {
                    incomplete: vec![id.clone()],
                }
            })?;
            nodes.push(DocNode {
                id,
                kind,
                position: entry.position,
                level: Some(kind.level()),
                data: clause.to_value()?,
            });
        }

        Ok(QueryDoc {
            query_name: self.query_name.clone(),
            nodes,
            edges: self.edges.iter().map(GraphEdge::to_doc).collect(),
        })
    }

    /// The query document wrapped for the create/update entity calls
    pub fn to_entities_doc(&self) -> GraphResult<EntitiesDoc> {
        let doc = self.to_document()?;
        info!(query = %doc.query_name, nodes = doc.nodes.len(), "Query document built");
        Ok(EntitiesDoc::single(
            EntityKind::Query,
            serde_json::to_value(&doc)?,
        ))
    }

    /// Rebuild a live graph from a persisted document. The query name becomes
    /// read-only; every node is seeded from its clause and recomputed once its
    /// upstream nodes have been.
    pub fn from_document(doc: QueryDoc, catalog: Catalog) -> GraphResult<Self> {
        let mut graph = Self::new(catalog);
        graph.query_name = doc.query_name;
        graph.read_only_name = true;

        for doc_node in doc.nodes {
            if graph.nodes.contains_key(&doc_node.id) {
                return Err(GraphError::NodeAlreadyExists(doc_node.id));
            }
            let node = graph.seed_node(&doc_node.id, doc_node.kind, doc_node.data)?;
            graph.nodes.insert(
                doc_node.id,
                GraphNode {
                    node,
                    position: doc_node.position,
                },
            );
        }

        for doc_edge in doc.edges {
            let edge = graph.edge_from_doc(doc_edge)?;
            graph.edges.push(edge);
        }

        let order = graph.topological_order()?;
        for id in &order {
            graph.wire(id);
        }

        info!(
            query = %graph.query_name,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            incomplete = graph.incomplete_nodes().len(),
            "Query graph loaded"
        );
        Ok(graph)
    }

    fn seed_node(&self, id: &str, kind: NodeKind, data: serde_json::Value) -> GraphResult<QueryNode> {
        if !kind.is_query_node() {
            return Err(GraphError::UnsupportedKind(kind));
        }
        let unfinished = data.is_null() || data.as_object().is_some_and(|o| o.is_empty());
        if unfinished {
            return QueryNode::new(kind).ok_or(GraphError::UnsupportedKind(kind));
        }
        match Clause::from_value(kind, data) {
            Ok(Some(clause)) => Ok(QueryNode::from_clause(clause, &self.catalog)),
            Ok(None) => Err(GraphError::UnsupportedKind(kind)),
            Err(e) => Err(GraphError::InvalidDocument(format!("node '{}': {}", id, e))),
        }
    }

    fn edge_from_doc(&self, edge: DocEdge) -> GraphResult<GraphEdge> {
        let consumer_kind = self.kind_of(&edge.source).ok_or_else(|| {
            GraphError::InvalidEdge(format!("unknown source node '{}'", edge.source))
        })?;
        let upstream_kind = self.kind_of(&edge.target).ok_or_else(|| {
            GraphError::InvalidEdge(format!("unknown target node '{}'", edge.target))
        })?;
        if edge.source == edge.target {
            return Err(GraphError::InvalidEdge(
                ConnectionError::SelfLoop(edge.source).to_string(),
            ));
        }

        let port = match edge.source_handle.as_deref() {
            Some(handle) => Port::resolve(consumer_kind, handle),
            None => match consumer_kind.ports() {
                [only] => Some(*only),
                _ => None,
            },
        }
        .ok_or_else(|| {
            GraphError::InvalidEdge(format!(
                "{} node '{}' has no input '{}'",
                consumer_kind,
                edge.source,
                edge.source_handle.as_deref().unwrap_or_default()
            ))
        })?;

        if !consumer_kind.accepts(upstream_kind) {
            return Err(GraphError::InvalidEdge(
                ConnectionError::KindNotAccepted {
                    consumer: consumer_kind,
                    upstream: upstream_kind,
                }
                .to_string(),
            ));
        }
        if self.upstream_of(&edge.source, port).is_some() {
            return Err(GraphError::InvalidEdge(format!(
                "node '{}' has more than one edge on '{}'",
                edge.source, port
            )));
        }

        Ok(GraphEdge {
            id: edge.id,
            consumer: edge.source,
            port,
            upstream: edge.target,
            source_handle: edge.source_handle,
            target_handle: edge.target_handle,
        })
    }

    fn kind_of(&self, id: &str) -> Option<NodeKind> {
        self.nodes.get(id).map(|n| n.node.kind())
    }

    // (upstream, consumer) pairs, in data-flow direction
    fn flow_edges(&self) -> impl Iterator<Item = (&str, &str)> + Clone {
        self.edges
            .iter()
            .map(|e| (e.upstream.as_str(), e.consumer.as_str()))
    }

    fn input_for(&self, consumer: &str, port: Port) -> Input {
        match self.upstream_of(consumer, port) {
            None => Input::Disconnected,
            Some(upstream) => match self
                .nodes
                .get(upstream)
                .and_then(|n| n.node.editor().published())
            {
                Some(published) => Input::Ready(published.clone()),
                None => Input::Pending,
            },
        }
    }

    /// Hand `id` fresh snapshots of all its ports and recompute it
    fn wire(&mut self, id: &str) {
        let Some(kind) = self.kind_of(id) else {
            return;
        };
        let inputs: Vec<(Port, Input)> = kind
            .ports()
            .iter()
            .map(|&port| (port, self.input_for(id, port)))
            .collect();
        if let Some(entry) = self.nodes.get_mut(id) {
            let editor = entry.node.editor_mut();
            for (port, input) in inputs {
                editor.set_input(port, input);
            }
            editor.refresh();
        }
    }

    /// Recompute every node downstream of `from`, upstream first
    fn propagate(&mut self, from: &str) {
        let order = match self.topological_order() {
            Ok(order) => order,
            Err(err) => {
                warn!(error = %err, "Skipping propagation");
                return;
            }
        };

        let mut affected: HashSet<String> = HashSet::new();
        affected.insert(from.to_string());
        for id in order {
            if id == from {
                continue;
            }
            let reads_affected = self
                .edges
                .iter()
                .any(|e| e.consumer == id && affected.contains(&e.upstream));
            if reads_affected {
                self.wire(&id);
                affected.insert(id);
            }
        }
        debug!(from, recomputed = affected.len() - 1, "Propagated upstream change");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::StreamDecl;
    use crate::model::{Attribute, PrimitiveType, TypeSpec};

    fn catalog() -> Catalog {
        Catalog::new(
            vec![StreamDecl::new(
                "Orders",
                vec![
                    Attribute::new("orderId", PrimitiveType::Integer.into()),
                    Attribute::new("amount", PrimitiveType::Float.into()),
                    Attribute::new("status", TypeSpec::new(PrimitiveType::String.into(), Some(10))),
                ],
            )],
            Vec::new(),
        )
    }

    fn stream_and_select(graph: &mut QueryGraph) -> (String, String) {
        let stream = graph.add_node(NodeKind::Stream, Position::default()).unwrap();
        graph.choose_stream(&stream, "Orders").unwrap();
        graph.finish(&stream).unwrap();
        let select = graph.add_node(NodeKind::Select, Position::default()).unwrap();
        graph.connect(&select, Port::In, &stream).unwrap();
        (stream, select)
    }

    #[test]
    fn test_enum_nodes_are_rejected() {
        let mut graph = QueryGraph::new(catalog());
        let err = graph.add_node(NodeKind::Enum, Position::default()).unwrap_err();
        assert!(matches!(err, GraphError::UnsupportedKind(NodeKind::Enum)));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_connection_policy() {
        let mut graph = QueryGraph::new(catalog());
        let (stream, select) = stream_and_select(&mut graph);
        let project = graph.add_node(NodeKind::Project, Position::default()).unwrap();

        assert_eq!(
            graph.can_connect(&select, Port::In, &select),
            Err(ConnectionError::SelfLoop(select.clone()))
        );
        assert!(matches!(
            graph.can_connect(&project, Port::In, &stream),
            Err(ConnectionError::KindNotAccepted { .. })
        ));
        assert!(matches!(
            graph.can_connect(&project, Port::Left, &select),
            Err(ConnectionError::InvalidPort { .. })
        ));
        assert!(matches!(
            graph.can_connect(&project, Port::In, "missing"),
            Err(ConnectionError::UnknownNode(_))
        ));
        assert!(graph.can_connect(&project, Port::In, &select).is_ok());

        // rejected connections leave the graph untouched
        assert!(graph.connect(&project, Port::In, &stream).is_err());
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut graph = QueryGraph::new(catalog());
        let (_, select) = stream_and_select(&mut graph);
        let a = graph.add_node(NodeKind::GroupBy, Position::default()).unwrap();
        let b = graph.add_node(NodeKind::Aggregate, Position::default()).unwrap();
        graph.connect(&a, Port::In, &select).unwrap();
        graph.connect(&b, Port::In, &a).unwrap();

        assert!(matches!(
            graph.can_connect(&a, Port::In, &b),
            Err(ConnectionError::WouldCycle { .. })
        ));
    }

    #[test]
    fn test_connect_replaces_edge_on_same_port() {
        let mut graph = QueryGraph::new(catalog());
        let (_, first) = stream_and_select(&mut graph);
        let (_, second) = stream_and_select(&mut graph);
        let project = graph.add_node(NodeKind::Project, Position::default()).unwrap();

        graph.connect(&project, Port::In, &first).unwrap();
        graph.connect(&project, Port::In, &second).unwrap();
        assert_eq!(graph.upstream_of(&project, Port::In), Some(second.as_str()));
        assert_eq!(graph.consumers_of(&first).count(), 0);
    }

    #[test]
    fn test_finish_propagates_downstream() {
        let mut graph = QueryGraph::new(catalog());
        let (_, select) = stream_and_select(&mut graph);
        let project = graph.add_node(NodeKind::Project, Position::default()).unwrap();
        graph.connect(&project, Port::In, &select).unwrap();

        // select not finished yet
        let candidates = graph.node(&project).unwrap().as_project().unwrap().selection().len();
        assert_eq!(candidates, 0);

        graph.finish(&select).unwrap();
        let candidates = graph.node(&project).unwrap().as_project().unwrap().selection().len();
        assert_eq!(candidates, 3);
    }

    #[test]
    fn test_remove_node_invalidates_dependants() {
        let mut graph = QueryGraph::new(catalog());
        let (stream, select) = stream_and_select(&mut graph);
        graph.finish(&select).unwrap();
        assert!(graph.is_commit_ready());

        graph.remove_node(&stream).unwrap();
        assert!(graph.edges().is_empty());
        let node = graph.node(&select).unwrap();
        assert!(!node.editor().is_complete());
        assert_eq!(graph.incomplete_nodes(), vec![select]);
    }

    #[test]
    fn test_to_document_requires_name_and_complete_nodes() {
        let mut graph = QueryGraph::new(catalog());
        let (_, select) = stream_and_select(&mut graph);

        assert!(matches!(
            graph.to_document(),
            Err(GraphError::InvalidQueryName(ValidationIssue::EmptyName("Query")))
        ));
        graph.set_query_name("AllOrders").unwrap();
        match graph.to_document() {
            Err(GraphError::NotCommitReady { incomplete }) => assert_eq!(incomplete, vec![select.clone()]),
            other => panic!("unexpected result: {:?}", other),
        }

        graph.finish(&select).unwrap();
        let doc = graph.to_document().unwrap();
        assert_eq!(doc.nodes[0].kind, NodeKind::Stream);
        assert_eq!(doc.nodes[0].level, Some(1));
        assert_eq!(doc.edges[0].source, select);
        assert_eq!(doc.edges[0].source_handle.as_deref(), Some("in"));
    }

    #[test]
    fn test_loaded_name_is_read_only() {
        let mut graph = QueryGraph::new(catalog());
        let (_, select) = stream_and_select(&mut graph);
        graph.finish(&select).unwrap();
        graph.set_query_name("AllOrders").unwrap();
        let doc = graph.to_document().unwrap();

        let mut loaded = QueryGraph::from_document(doc, catalog()).unwrap();
        assert!(loaded.has_read_only_name());
        assert_eq!(
            loaded.set_query_name("Other"),
            Err(ValidationIssue::ReadOnlyName("AllOrders".to_string()))
        );
        assert!(loaded.set_query_name("AllOrders").is_ok());
    }
}
