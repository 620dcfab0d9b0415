//! Persistence/auth collaborator error types
//!
//! Every REST call either yields data or one of these categories. Callers surface
//! the message through the notifier; `Unauthorized` additionally means the
//! session has already been cleared.

use thiserror::Error;

/// Errors returned by the persistence/auth collaborator
#[derive(Error, Debug)]
pub enum ApiError {
    /// No session id is stored
    #[error("Not logged in")]
    NotLoggedIn,

    /// Server answered 401; the local session was dropped
    #[error("Session expired or unauthorized: {0}")]
    Unauthorized(String),

    /// Server answered with a non-ok envelope or an error status
    #[error("{message}")]
    Rejected {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    /// Request never produced a response
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body did not have the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Configured base URL cannot address the API
    #[error("Invalid API base URL '{0}'")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// Build a rejection with only a message
    pub fn rejected(message: impl Into<String>) -> Self {
        ApiError::Rejected {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// 401-class failures reset the caller to an unauthenticated state
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_) | ApiError::NotLoggedIn)
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Rejected { status, .. } => *status,
            ApiError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Get error code for CLI output
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotLoggedIn | ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Rejected { .. } => "REJECTED",
            ApiError::Transport(_) => "UNAVAILABLE",
            ApiError::Decode(_) => "INTERNAL",
            ApiError::InvalidBaseUrl(_) => "INVALID_CONFIG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_uses_server_message() {
        let err = ApiError::Rejected {
            status: Some(400),
            code: Some("E_EXISTS".to_string()),
            message: "File already exists".to_string(),
        };
        assert_eq!(err.to_string(), "File already exists");
        assert_eq!(err.status(), Some(400));
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_unauthorized_category() {
        let err = ApiError::Unauthorized("expired".to_string());
        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.error_code(), "UNAUTHORIZED");
    }
}
