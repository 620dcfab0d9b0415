//! Domain-specific error types for mlndash
//!
//! This module provides structured error types for the different layers of the
//! editor core, so callers can tell local validation problems apart from
//! rejected connections, malformed documents and collaborator failures.
//!
//! # Error Categories
//!
//! - **ValidationIssue**: field-level problems that block a node's finish
//! - **ConnectionError**: edges the connection policy forbids
//! - **GraphError**: graph assembly, commit gate and document reconstruction
//! - **ApiError**: persistence/auth collaborator failures
//! - **DashboardError**: dialog-level flows combining the above
//!
//! # Examples
//!
//! ```rust
//! use mlndash::errors::{GraphError, ValidationIssue};
//!
//! let err = GraphError::NodeNotFound("node-1".to_string());
//! assert!(err.is_not_found());
//!
//! let issue = ValidationIssue::EmptyName("Stream");
//! assert_eq!(issue.to_string(), "Please provide Stream name");
//! ```

pub mod api;
pub mod dashboard;
pub mod graph;
pub mod validation;

pub use api::ApiError;
pub use dashboard::DashboardError;
pub use graph::{ConnectionError, GraphError};
pub use validation::{IssueLocation, ValidationIssue};

/// Issues collected while validating a draft
pub type Issues = Vec<ValidationIssue>;

/// Result type alias for local validation
pub type ValidationResult<T> = Result<T, Issues>;

/// Result type alias for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Result type alias for collaborator calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for dashboard flows
pub type DashboardResult<T> = Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_result_alias() {
        let result: GraphResult<i32> = Err(GraphError::NodeNotFound("a".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_result_alias() {
        let result: ValidationResult<()> = Err(vec![ValidationIssue::MissingSize]);
        assert_eq!(result.unwrap_err().len(), 1);
    }

    #[test]
    fn test_api_result_alias() {
        let result: ApiResult<()> = Err(ApiError::NotLoggedIn);
        assert!(result.is_err());
    }
}
