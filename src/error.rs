//! Error types for the orchestration core
//!
//! Validation faults are raised before any request is sent; transport faults
//! carry the operation that produced them so they can be logged with context.

use thiserror::Error;

/// Errors surfaced by the orchestration core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DashboardError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown test: {0}")]
    UnknownTest(String),

    #[error("{operation} failed: {message}")]
    Network { operation: String, message: String },

    #[error("{operation} returned HTTP {status}: {body}")]
    Server {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Log stream transport error: {0}")]
    StreamTransport(String),

    #[error("Malformed {context}: {message}")]
    MalformedPayload { context: String, message: String },
}

impl DashboardError {
    pub fn validation(message: impl Into<String>) -> Self {
        DashboardError::Validation(message.into())
    }

    pub fn network(operation: impl Into<String>, message: impl Into<String>) -> Self {
        DashboardError::Network {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn malformed(context: impl Into<String>, message: impl ToString) -> Self {
        DashboardError::MalformedPayload {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// True for faults raised locally, without any network call
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DashboardError::Validation(_) | DashboardError::UnknownTest(_)
        )
    }
}

pub type DashboardResult<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(DashboardError::validation("empty").is_validation());
        assert!(DashboardError::UnknownTest("x".into()).is_validation());
        assert!(!DashboardError::network("poll", "refused").is_validation());
        assert!(!DashboardError::StreamTransport("eof".into()).is_validation());
    }

    #[test]
    fn test_error_display() {
        let err = DashboardError::Server {
            operation: "Batch dispatch".into(),
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "Batch dispatch returned HTTP 500: boom");

        let err = DashboardError::malformed("log event", "expected value");
        assert_eq!(err.to_string(), "Malformed log event: expected value");
    }
}
