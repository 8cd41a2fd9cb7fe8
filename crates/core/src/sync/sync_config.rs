//! Tunables for the transaction sync service.

use std::time::Duration;

use crate::transactions::DEFAULT_FINGERPRINT_TOLERANCE_SECS;

/// Upper bound for a single ledger call before it counts as unreachable.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub remote_timeout: Duration,
    pub fingerprint_tolerance: chrono::Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
            fingerprint_tolerance: chrono::Duration::seconds(DEFAULT_FINGERPRINT_TOLERANCE_SECS),
        }
    }
}

impl SyncConfig {
    pub fn with_remote_timeout(mut self, remote_timeout: Duration) -> Self {
        self.remote_timeout = remote_timeout;
        self
    }

    pub fn with_fingerprint_tolerance(mut self, tolerance: chrono::Duration) -> Self {
        self.fingerprint_tolerance = tolerance;
        self
    }
}
