//! Error types for the scenario test helper.
//!
//! Uses hierarchical domain-specific errors following the thiserror pattern.
//! Remote failures are [`ClusterError`]s carrying a [`StatusCode`]; policy
//! failures raised by the execution engine and the namespace reconciler are
//! variants of the top-level [`Error`].

use crate::cluster::SchemeEntryType;
use crate::status::{StatusCode, StatusSet};
use std::fmt;
use thiserror::Error;

/// Result type alias for helper operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for raw cluster calls.
pub type ClusterResult<T> = std::result::Result<T, ClusterError>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A remote call failed outside of the engine's status policy
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// The engine saw a status that is neither expected nor retriable
    #[error("Unexpected status: must be in {expected}, but get {actual}")]
    UnexpectedStatus { expected: StatusSet, actual: Outcome },

    /// All attempts were spent without reaching an expected status
    #[error("Retries exceeded with unexpected status: must be in {expected}, but get {actual}")]
    RetriesExceeded { expected: StatusSet, actual: Outcome },

    /// A catalog entry kind the reconciler cannot drop
    #[error("Cannot remove type {kind:?} for path {path}")]
    UnsupportedEntry { path: String, kind: SchemeEntryType },

    /// Schema refers to names it does not declare
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// The cluster answered with data of an unexpected shape
    #[error("Invalid result: {0}")]
    InvalidResult(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error returned by the cluster for a single request.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{status}: {message}")]
pub struct ClusterError {
    /// Status code of the failed request
    pub status: StatusCode,
    /// Server or transport diagnostic text
    pub message: String,
}

impl ClusterError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Path does not exist, or the schema operation was rejected.
    pub fn scheme(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SchemeError, message)
    }

    /// True for scheme errors, which listing and describe treat as benign absence.
    pub fn is_scheme_error(&self) -> bool {
        self.status == StatusCode::SchemeError
    }
}

/// What the last attempt produced, for failure messages.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The operation returned normally
    Status(StatusCode),
    /// The operation failed with a remote error
    Error(ClusterError),
}

impl Outcome {
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::Status(status) => *status,
            Outcome::Error(err) => err.status,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Status(status) => write!(f, "{}", status),
            Outcome::Error(err) => write!(f, "{}", err),
        }
    }
}

// Conversion implementations for external error types

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("invalid value".into());
        assert_eq!(err.to_string(), "Configuration error: invalid value");

        let cluster_err = ClusterError::new(StatusCode::Overloaded, "too many requests");
        let err: Error = cluster_err.into();
        assert_eq!(err.to_string(), "Cluster error: OVERLOADED: too many requests");
    }

    #[test]
    fn test_unexpected_status_message() {
        let err = Error::UnexpectedStatus {
            expected: StatusCode::Success.into(),
            actual: Outcome::Error(ClusterError::scheme("path not found")),
        };
        let text = err.to_string();
        assert!(text.contains("must be in {SUCCESS}"));
        assert!(text.contains("SCHEME_ERROR: path not found"));
    }

    #[test]
    fn test_scheme_error_detection() {
        assert!(ClusterError::scheme("missing").is_scheme_error());
        assert!(!ClusterError::new(StatusCode::NotFound, "missing").is_scheme_error());
    }

    #[test]
    fn test_unsupported_entry() {
        let err = Error::UnsupportedEntry {
            path: "/local/dir/topic".into(),
            kind: SchemeEntryType::Topic,
        };
        assert_eq!(err.to_string(), "Cannot remove type Topic for path /local/dir/topic");
    }
}
