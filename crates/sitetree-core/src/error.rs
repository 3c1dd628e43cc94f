// ABOUTME: Error taxonomy for the page-tree engine
// ABOUTME: Distinguishes recoverable absence, retryable I/O failures, and integrity problems

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TreeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A page path or project is absent; rendered as an empty state
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Duplicate sibling names or an ambiguous insert target
    #[error("data integrity violation: {message}")]
    DataIntegrity { message: String },

    #[error("invalid request: {reason}")]
    Invalid { reason: String },
}

impl TreeError {
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn page_not_found(project: &str, path: &str) -> Self {
        let shown = if path.is_empty() { "/" } else { path };
        Self::NotFound {
            what: format!("page '{shown}' in project '{project}'"),
        }
    }

    pub fn project_not_found(project: &str) -> Self {
        Self::NotFound {
            what: format!("project '{project}'"),
        }
    }

    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn server<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    pub fn data_integrity<S: Into<String>>(message: S) -> Self {
        Self::DataIntegrity {
            message: message.into(),
        }
    }

    pub fn invalid<S: Into<String>>(reason: S) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }

    /// Whether the UI can carry on and render an empty or partial state
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::DataIntegrity { .. })
    }

    /// Whether retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_properties() {
        assert!(TreeError::not_found("x").is_recoverable());
        assert!(!TreeError::not_found("x").is_retryable());

        assert!(TreeError::network("connection reset").is_retryable());
        assert!(TreeError::server(503, "unavailable").is_retryable());
        assert!(!TreeError::server(400, "bad request").is_retryable());

        let integrity = TreeError::data_integrity("duplicate sibling 'blog'");
        assert!(integrity.is_recoverable());
        assert!(!integrity.is_retryable());
    }

    #[test]
    fn test_page_not_found_message() {
        let error = TreeError::page_not_found("example.com", "");
        assert_eq!(
            error.to_string(),
            "page '/' in project 'example.com' not found"
        );
    }
}
