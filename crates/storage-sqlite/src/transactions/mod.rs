//! SQLite-backed local cache of ledger transactions.

mod model;
mod repository;

pub use model::{timestamp_from_db, timestamp_to_db, CachedTransactionDB};
pub use repository::SqliteTransactionCache;
