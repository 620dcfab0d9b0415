//! Errors for dashboard flows (opening editors, visualizing files, committing)

use thiserror::Error;

use super::{api::ApiError, graph::GraphError};

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Cannot visualize '{0}': only .qry, .str and .enum files are supported")]
    UnsupportedFile(String),

    #[error("File '{file}' is not a valid document: {source}")]
    MalformedFile {
        file: String,
        source: serde_json::Error,
    },

    #[error("Nothing to commit")]
    NothingToCommit,
}

impl DashboardError {
    /// Message shown to the user through the notifier
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::Api(ApiError::Rejected { message, .. }) => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            DashboardError::Api(err) => err.error_code(),
            DashboardError::Graph(err) => err.error_code(),
            DashboardError::UnsupportedFile(_) => "UNSUPPORTED_FILE",
            DashboardError::MalformedFile { .. } => "MALFORMED_FILE",
            DashboardError::NothingToCommit => "NOTHING_TO_COMMIT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = DashboardError::from(ApiError::rejected("Stream already exists"));
        assert_eq!(err.user_message(), "Stream already exists");

        let err = DashboardError::UnsupportedFile("notes.txt".to_string());
        assert!(err.user_message().contains("notes.txt"));
        assert_eq!(err.error_code(), "UNSUPPORTED_FILE");
    }
}
