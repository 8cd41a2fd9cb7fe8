//! Transaction domain model, fingerprinting and collaborator contracts.

mod cache_migration;
mod fingerprint;
mod memory_cache;
mod transactions_model;
mod transactions_traits;

pub use cache_migration::migrate_transaction_cache;
pub use fingerprint::{TransactionFingerprint, DEFAULT_FINGERPRINT_TOLERANCE_SECS};
pub use memory_cache::InMemoryTransactionCache;
pub use transactions_model::*;
pub use transactions_traits::*;
