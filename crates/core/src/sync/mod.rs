//! Offline backup log and the orchestrator that reconciles it with the ledger.

mod account_locks;
mod memory_log;
mod pending_operation_model;
mod replay_plan;
mod retry_policy;
mod sync_config;
mod sync_service;
mod sync_traits;

pub use account_locks::AccountLocks;
pub use memory_log::InMemoryPendingOperationLog;
pub use pending_operation_model::*;
pub use replay_plan::{plan_replay, PlannedOperation, ReplayPlan};
pub use retry_policy::*;
pub use sync_config::*;
pub use sync_service::TransactionSyncService;
pub use sync_traits::*;
