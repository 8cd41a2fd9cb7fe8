//! SQLite persistence for the ledger transaction cache and pending log.
//!
//! Reads go through an r2d2 pool; every write runs on a single writer thread
//! inside an immediate transaction (see [`db::WriteHandle`]).

pub mod db;
pub mod errors;
pub mod pending_operations;
pub mod schema;
pub mod transactions;

pub use db::{create_pool, get_connection, init, open, run_migrations, DbPool, WriteHandle};
pub use errors::StorageError;
pub use pending_operations::SqlitePendingOperationLog;
pub use transactions::SqliteTransactionCache;
