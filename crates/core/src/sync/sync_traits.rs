use async_trait::async_trait;

use super::pending_operation_model::{LocalOperationId, PendingOperation};
use super::retry_policy::ReplayReport;
use crate::errors::Result;
use crate::transactions::{Direction, NewTransaction, Period, Transaction, TransactionId};

/// Ordered log of write intents the ledger has not confirmed yet.
///
/// `all` returns entries in insertion order; replay depends on it.
#[async_trait]
pub trait PendingOperationLogTrait: Send + Sync {
    async fn all(&self) -> Result<Vec<PendingOperation>>;

    async fn insert(&self, operation: PendingOperation) -> Result<()>;

    /// Replace the entry with the same local id, keeping its position.
    /// No-op when the entry is gone.
    async fn update(&self, operation: PendingOperation) -> Result<()>;

    async fn remove(&self, local_id: &LocalOperationId) -> Result<()>;

    async fn persist(&self) -> Result<()>;
}

/// Read/write facade over the ledger, the local cache and the pending log.
///
/// Ledger failures never surface from these methods; only local persistence
/// failures and invalid input do.
#[async_trait]
pub trait TransactionSyncServiceTrait: Send + Sync {
    /// Drains the pending log, refreshes the window from the ledger and
    /// returns the account's transactions in `period` with the given
    /// direction, newest first. Falls back to the local view when the ledger
    /// cannot be read.
    async fn list_transactions(
        &self,
        account_id: i64,
        direction: Direction,
        period: &Period,
    ) -> Result<Vec<Transaction>>;

    /// Returns the ledger-confirmed record, or an optimistic one carrying a
    /// local id when the ledger could not be reached.
    async fn create_transaction(&self, new_transaction: NewTransaction) -> Result<Transaction>;

    async fn update_transaction(&self, transaction: Transaction) -> Result<Transaction>;

    /// Removes the record locally right away; queues the ledger delete when
    /// it cannot be confirmed.
    async fn delete_transaction(&self, transaction_id: &TransactionId) -> Result<()>;

    /// Replays the account's pending log without reading the ledger window.
    async fn replay_pending(&self, account_id: i64) -> Result<ReplayReport>;

    /// Unresolved intents of one account, in log order.
    async fn pending_operations(&self, account_id: i64) -> Result<Vec<PendingOperation>>;

    /// Drops an intent for good. Returns false when no such entry exists.
    async fn discard_pending_operation(&self, local_id: &LocalOperationId) -> Result<bool>;
}
