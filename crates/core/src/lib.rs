//! Core domain and synchronization engine for the ledger transaction cache.
//!
//! The crate owns the transaction model, the contracts for the remote ledger,
//! the local cache and the pending-operations log, and the orchestrator that
//! keeps the three consistent. It performs no I/O of its own.

pub mod errors;
pub mod sync;
pub mod transactions;

pub use errors::{DatabaseError, Error, RemoteError, Result};
