//! SQLite-backed pending-operations log.

mod model;
mod repository;

pub use model::PendingOperationDB;
pub use repository::SqlitePendingOperationLog;
