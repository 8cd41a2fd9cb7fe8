//! Contracts the orchestrator depends on.

use async_trait::async_trait;
use chrono::Duration;

use super::fingerprint::TransactionFingerprint;
use super::transactions_model::{NewTransaction, Period, Transaction, TransactionId};
use crate::errors::{RemoteError, Result};

/// Result type for remote ledger calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// One period of an account as the ledger listed it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerWindow {
    pub transactions: Vec<Transaction>,
    /// Ids of listed records that could not be decoded. Their cached copies
    /// are kept when the window is replaced.
    pub undecodable_ids: Vec<i64>,
}

/// Authoritative ledger of transactions.
#[async_trait]
pub trait LedgerClientTrait: Send + Sync {
    async fn create_transaction(&self, new_transaction: &NewTransaction)
        -> RemoteResult<Transaction>;

    /// Requires a confirmed id; the ledger has never seen local ids.
    async fn update_transaction(&self, transaction: &Transaction) -> RemoteResult<Transaction>;

    async fn delete_transaction(&self, transaction_id: i64) -> RemoteResult<()>;

    /// All transactions of `account_id` whose timestamp lies in `period`.
    async fn list_transactions(
        &self,
        account_id: i64,
        period: &Period,
    ) -> RemoteResult<LedgerWindow>;
}

/// Last known-good snapshot of transactions.
///
/// Mutations are visible immediately to later calls on the same instance;
/// only `persist` guarantees durability in the underlying engine.
#[async_trait]
pub trait TransactionCacheTrait: Send + Sync {
    async fn all(&self) -> Result<Vec<Transaction>>;

    async fn get(&self, id: &TransactionId) -> Result<Option<Transaction>>;

    /// Upsert by id.
    async fn insert(&self, transaction: Transaction) -> Result<()>;

    /// Replace an existing record; no-op when the id is unknown.
    async fn update(&self, transaction: Transaction) -> Result<()>;

    async fn remove(&self, id: &TransactionId) -> Result<()>;

    /// Remove every optimistic (local id) record matching `fingerprint`
    /// within `tolerance`. Confirmed records are never touched. Returns the
    /// number of records removed.
    async fn find_and_remove(
        &self,
        fingerprint: &TransactionFingerprint,
        tolerance: Duration,
    ) -> Result<usize>;

    /// Remove every record of `account_id` whose timestamp lies in `period`.
    async fn remove_window(&self, account_id: i64, period: &Period) -> Result<usize>;

    async fn persist(&self) -> Result<()>;
}
