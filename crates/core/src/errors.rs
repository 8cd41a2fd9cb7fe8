//! Error types shared by the core and its storage/transport adapters.

use thiserror::Error;

use crate::sync::{classify_http_status, RemoteRetryClass};

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error surfaced to callers of the core.
#[derive(Error, Debug)]
pub enum Error {
    /// Local persistence failure. Always fatal for the calling operation.
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    /// Remote ledger failure. The orchestrator absorbs these; they only
    /// escape from direct collaborator calls.
    #[error("Remote ledger error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// True for failures of the local persistence engine.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Serialization(_))
    }
}

/// Errors raised by local persistence engines.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Failures talking to the remote ledger.
///
/// Every variant sends a write down the offline path; none of them is fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// No network, connection refused, TLS failure and the like.
    #[error("Remote ledger unavailable: {0}")]
    TransportUnavailable(String),

    /// The call did not finish within the configured timeout.
    #[error("Remote ledger request timed out")]
    Timeout,

    /// HTTP-level rejection from the ledger.
    #[error("Remote ledger rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Failed to encode request: {0}")]
    Encoding(String),

    #[error("Failed to decode response: {0}")]
    Decoding(String),
}

impl RemoteError {
    /// Create a rejection from status and message.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// HTTP status if the ledger answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the ledger could not be reached. Replay stops at the first
    /// such failure since every later call would fail the same way.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::TransportUnavailable(_) | Self::Timeout)
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Classify error for retry policy.
    pub fn retry_class(&self) -> RemoteRetryClass {
        match self {
            Self::Rejected { status, .. } => classify_http_status(*status),
            Self::TransportUnavailable(_) | Self::Timeout => RemoteRetryClass::Retryable,
            // Wire-format mismatches may clear up after a server deploy.
            Self::Encoding(_) | Self::Decoding(_) => RemoteRetryClass::Retryable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_error_reports_status() {
        let err = RemoteError::rejected(422, "invalid category");
        assert_eq!(err.status_code(), Some(422));
        assert_eq!(err.retry_class(), RemoteRetryClass::Permanent);
        assert!(!err.is_unreachable());
    }

    #[test]
    fn transport_failures_are_unreachable_and_retryable() {
        for err in [
            RemoteError::Timeout,
            RemoteError::TransportUnavailable("connection refused".to_string()),
        ] {
            assert!(err.is_unreachable());
            assert_eq!(err.retry_class(), RemoteRetryClass::Retryable);
        }
    }

    #[test]
    fn persistence_failures_are_flagged() {
        let err = Error::Database(DatabaseError::QueryFailed("disk I/O error".to_string()));
        assert!(err.is_persistence_failure());
        assert!(!Error::Remote(RemoteError::Timeout).is_persistence_failure());
    }
}
