//! Graph-related error types
//!
//! Covers connection attempts the policy forbids, graph mutations on unknown
//! nodes, the commit gate and reconstruction of persisted query documents.
//!
//! # Examples
//!
//! ```rust
//! use mlndash::errors::{ConnectionError, GraphError};
//!
//! let err = GraphError::CycleDetected("a -> b -> a".to_string());
//! assert_eq!(err.error_code(), "CYCLE_DETECTED");
//!
//! let err: GraphError = ConnectionError::SelfLoop("a".to_string()).into();
//! assert!(err.is_client_error());
//! ```

use thiserror::Error;

use super::validation::ValidationIssue;
use crate::query::NodeKind;

/// Rejected connection attempts
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum ConnectionError {
    #[error("Node '{0}' cannot connect to itself")]
    SelfLoop(String),

    #[error("Node '{0}' does not exist")]
    UnknownNode(String),

    #[error("{consumer} nodes cannot read from {upstream} nodes")]
    KindNotAccepted {
        consumer: NodeKind,
        upstream: NodeKind,
    },

    #[error("{kind} nodes have no '{port}' input")]
    InvalidPort { kind: NodeKind, port: String },

    #[error("Connecting {consumer} to {upstream} would create a cycle")]
    WouldCycle { consumer: String, upstream: String },
}

/// Graph assembly and document errors
#[derive(Error, Debug)]
pub enum GraphError {
    /// Node not found by identifier
    #[error("Node '{0}' not found")]
    NodeNotFound(String),

    /// Node identifier used twice
    #[error("Node '{0}' already exists")]
    NodeAlreadyExists(String),

    /// Operation not available for this node kind
    #[error("Operation not supported for {0} nodes")]
    UnsupportedKind(NodeKind),

    /// Connection rejected by the policy
    #[error("Connection rejected: {0}")]
    Connection(#[from] ConnectionError),

    /// Cycle detected while ordering nodes
    #[error("Cycle detected in graph: {0}")]
    CycleDetected(String),

    /// Edge references a missing node or an unusable port
    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    /// A node failed to finish
    #[error("Node '{node}' is not valid: {}", join_issues(.issues))]
    NodeInvalid {
        node: String,
        issues: Vec<ValidationIssue>,
    },

    /// Query name failed validation
    #[error("Invalid query name: {0}")]
    InvalidQueryName(ValidationIssue),

    /// Commit attempted before every node was complete
    #[error("Graph is not ready to commit ({} incomplete node(s))", .incomplete.len())]
    NotCommitReady { incomplete: Vec<String> },

    /// Persisted document could not be interpreted
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl GraphError {
    /// Check if this error was caused by caller input
    pub fn is_client_error(&self) -> bool {
        !matches!(self, GraphError::Json(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, GraphError::NodeNotFound(_))
    }

    /// Get error code for API responses and CLI output
    pub fn error_code(&self) -> &'static str {
        match self {
            GraphError::NodeNotFound(_) => "NOT_FOUND",
            GraphError::NodeAlreadyExists(_) => "CONFLICT",
            GraphError::Connection(_) => "CONNECTION_REJECTED",
            GraphError::CycleDetected(_) => "CYCLE_DETECTED",
            GraphError::InvalidEdge(_)
            | GraphError::UnsupportedKind(_)
            | GraphError::NodeInvalid { .. }
            | GraphError::InvalidQueryName(_) => "VALIDATION_FAILED",
            GraphError::NotCommitReady { .. } => "NOT_READY",
            GraphError::InvalidDocument(_) | GraphError::Json(_) => "INVALID_DOCUMENT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_not_found() {
        let err = GraphError::NodeNotFound("n1".to_string());
        assert_eq!(err.to_string(), "Node 'n1' not found");
        assert!(err.is_not_found());
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_connection_error_conversion() {
        let err: GraphError = ConnectionError::KindNotAccepted {
            consumer: NodeKind::Select,
            upstream: NodeKind::Join,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Connection rejected: selectNode nodes cannot read from joinNode nodes"
        );
        assert_eq!(err.error_code(), "CONNECTION_REJECTED");
    }

    #[test]
    fn test_node_invalid_lists_issues() {
        let err = GraphError::NodeInvalid {
            node: "n1".to_string(),
            issues: vec![ValidationIssue::NoFieldsSelected, ValidationIssue::EmptyValue],
        };
        assert_eq!(
            err.to_string(),
            "Node 'n1' is not valid: Select at least one field; Value is required"
        );
    }

    #[test]
    fn test_not_commit_ready() {
        let err = GraphError::NotCommitReady {
            incomplete: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Graph is not ready to commit (2 incomplete node(s))"
        );
        assert_eq!(err.error_code(), "NOT_READY");
    }
}
