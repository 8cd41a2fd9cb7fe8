//! Retry classification and replay bookkeeping.

use serde::{Deserialize, Serialize};

/// Retry policy classification for ledger failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteRetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

impl RemoteRetryClass {
    pub fn code(&self) -> &'static str {
        match self {
            RemoteRetryClass::Retryable => "retryable",
            RemoteRetryClass::Permanent => "permanent",
            RemoteRetryClass::ReauthRequired => "reauth_required",
        }
    }
}

/// Classify HTTP status into retry behavior.
pub fn classify_http_status(status: u16) -> RemoteRetryClass {
    match status {
        401 | 403 => RemoteRetryClass::ReauthRequired,
        408 | 409 | 423 | 425 | 429 => RemoteRetryClass::Retryable,
        500..=599 => RemoteRetryClass::Retryable,
        _ => RemoteRetryClass::Permanent,
    }
}

/// Outcome of one replay pass over an account's pending operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    /// Operations confirmed by the ledger in this pass.
    pub replayed_count: usize,
    /// Operations dropped because a later entry made them redundant.
    pub superseded_count: usize,
    /// Operations the ledger rejected or could not be reached for.
    pub failed_count: usize,
    /// Operations still queued after the pass.
    pub remaining_count: usize,
    /// False when the pass stopped early because the ledger was unreachable.
    pub ledger_reachable: bool,
}
