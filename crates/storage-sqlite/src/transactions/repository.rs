use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;

use ledger_sync_core::transactions::{
    Period, Transaction, TransactionCacheTrait, TransactionFingerprint, TransactionId,
};
use ledger_sync_core::Result;

use super::model::{timestamp_to_db, CachedTransactionDB};
use crate::db::{checkpoint, get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::cached_transactions;
use crate::schema::cached_transactions::dsl::*;

pub struct SqliteTransactionCache {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SqliteTransactionCache {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        SqliteTransactionCache { pool, writer }
    }

    pub fn load_all_impl(&self) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = cached_transactions
            .order((transaction_date.desc(), id.asc()))
            .load::<CachedTransactionDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(Transaction::try_from).collect()
    }

    pub fn get_impl(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        let row = cached_transactions
            .find(transaction_id.to_string())
            .first::<CachedTransactionDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(Transaction::try_from).transpose()
    }

    pub fn count_for_account(&self, account: i64) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        let count = cached_transactions
            .filter(account_id.eq(account))
            .count()
            .get_result::<i64>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(count)
    }
}

fn upsert(conn: &mut SqliteConnection, row: &CachedTransactionDB) -> Result<()> {
    diesel::insert_into(cached_transactions::table)
        .values(row)
        .on_conflict(cached_transactions::id)
        .do_update()
        .set(row)
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(())
}

#[async_trait]
impl TransactionCacheTrait for SqliteTransactionCache {
    async fn all(&self) -> Result<Vec<Transaction>> {
        self.load_all_impl()
    }

    async fn get(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>> {
        self.get_impl(transaction_id)
    }

    async fn insert(&self, transaction: Transaction) -> Result<()> {
        let row = CachedTransactionDB::from(&transaction);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> { upsert(conn, &row) })
            .await
    }

    async fn update(&self, transaction: Transaction) -> Result<()> {
        let row = CachedTransactionDB::from(&transaction);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::update(cached_transactions.find(row.id.clone()))
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn remove(&self, transaction_id: &TransactionId) -> Result<()> {
        let key = transaction_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::delete(cached_transactions.find(key))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn find_and_remove(
        &self,
        fingerprint: &TransactionFingerprint,
        tolerance: Duration,
    ) -> Result<usize> {
        let fingerprint = fingerprint.clone();
        let (lower, upper) = fingerprint.timestamp_bounds(tolerance);
        let (lower, upper) = (timestamp_to_db(lower), timestamp_to_db(upper));

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                // The range scan narrows the candidates; the exact match
                // (numeric amount, normalized comment, strict tolerance)
                // happens on the domain records.
                let candidates = cached_transactions
                    .filter(account_id.eq(fingerprint.account_id))
                    .filter(category_id.eq(fingerprint.category_id))
                    .filter(transaction_date.ge(lower))
                    .filter(transaction_date.le(upper))
                    .load::<CachedTransactionDB>(conn)
                    .map_err(StorageError::from)?;

                let mut matched: Vec<String> = Vec::new();
                for row in candidates {
                    let key = row.id.clone();
                    let candidate = Transaction::try_from(row)?;
                    if candidate.id.is_local() && fingerprint.matches(&candidate, tolerance) {
                        matched.push(key);
                    }
                }
                if matched.is_empty() {
                    return Ok(0);
                }

                let removed = diesel::delete(cached_transactions.filter(id.eq_any(matched)))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                debug!(
                    "Removed {} cached records matching fingerprint for account {}",
                    removed, fingerprint.account_id
                );
                Ok(removed)
            })
            .await
    }

    async fn remove_window(&self, account: i64, period: &Period) -> Result<usize> {
        let start = timestamp_to_db(period.start);
        let end = timestamp_to_db(period.end);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let removed = diesel::delete(
                    cached_transactions
                        .filter(account_id.eq(account))
                        .filter(transaction_date.ge(start))
                        .filter(transaction_date.le(end)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(removed)
            })
            .await
    }

    async fn persist(&self) -> Result<()> {
        checkpoint(&self.pool)
    }
}
