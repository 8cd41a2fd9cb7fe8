//! Error types for the ledger client crate.

use ledger_sync_core::sync::{classify_http_status, RemoteRetryClass};
use ledger_sync_core::RemoteError;
use thiserror::Error;

/// Result type alias for ledger client operations.
pub type Result<T> = std::result::Result<T, LedgerClientError>;

/// Errors that can occur while talking to the ledger REST API.
#[derive(Debug, Error)]
pub enum LedgerClientError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success response from the ledger
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid request (unconfirmed id, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Token could not be turned into a header
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Response body was JSON but not a usable record
    #[error("Decode error: {0}")]
    Decode(String),
}

impl LedgerClientError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify error for retry policy.
    pub fn retry_class(&self) -> RemoteRetryClass {
        match self {
            Self::Api { status, .. } => classify_http_status(*status),
            Self::Http(_) => RemoteRetryClass::Retryable,
            Self::Json(_) | Self::Decode(_) => RemoteRetryClass::Permanent,
            Self::InvalidRequest(_) => RemoteRetryClass::Permanent,
            Self::Auth(_) => RemoteRetryClass::ReauthRequired,
        }
    }
}

impl From<LedgerClientError> for RemoteError {
    fn from(err: LedgerClientError) -> Self {
        match err {
            LedgerClientError::Http(e) if e.is_timeout() => RemoteError::Timeout,
            LedgerClientError::Http(e) if e.is_decode() => RemoteError::Decoding(e.to_string()),
            LedgerClientError::Http(e) => RemoteError::TransportUnavailable(e.to_string()),
            LedgerClientError::Json(e) => RemoteError::Decoding(e.to_string()),
            LedgerClientError::Decode(message) => RemoteError::Decoding(message),
            LedgerClientError::Api { status, message } => RemoteError::Rejected { status, message },
            LedgerClientError::InvalidRequest(message) => RemoteError::Encoding(message),
            LedgerClientError::Auth(message) => RemoteError::Encoding(message),
        }
    }
}
