//! HTTP adapter for the remote transaction ledger.
//!
//! [`LedgerClient`] implements `LedgerClientTrait` from `ledger-sync-core`
//! over the ledger's REST API. Failures surface as `RemoteError` so the
//! sync orchestrator can divert writes to its pending log.

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::LedgerClient;
pub use config::LedgerClientConfig;
pub use error::{LedgerClientError, Result};
