use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Duration;

use super::fingerprint::TransactionFingerprint;
use super::transactions_model::{Period, Transaction, TransactionId};
use super::transactions_traits::TransactionCacheTrait;
use crate::errors::Result;

/// Process-lifetime transaction cache. `persist` is a no-op.
#[derive(Debug, Default)]
pub struct InMemoryTransactionCache {
    transactions: RwLock<Vec<Transaction>>,
}

impl InMemoryTransactionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transactions(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions: RwLock::new(transactions),
        }
    }
}

#[async_trait]
impl TransactionCacheTrait for InMemoryTransactionCache {
    async fn all(&self) -> Result<Vec<Transaction>> {
        let guard = self
            .transactions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    async fn get(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        let guard = self
            .transactions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(guard.iter().find(|t| &t.id == id).cloned())
    }

    async fn insert(&self, transaction: Transaction) -> Result<()> {
        let mut guard = self
            .transactions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match guard.iter_mut().find(|t| t.id == transaction.id) {
            Some(existing) => *existing = transaction,
            None => guard.push(transaction),
        }
        Ok(())
    }

    async fn update(&self, transaction: Transaction) -> Result<()> {
        let mut guard = self
            .transactions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = guard.iter_mut().find(|t| t.id == transaction.id) {
            *existing = transaction;
        }
        Ok(())
    }

    async fn remove(&self, id: &TransactionId) -> Result<()> {
        let mut guard = self
            .transactions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.retain(|t| &t.id != id);
        Ok(())
    }

    async fn find_and_remove(
        &self,
        fingerprint: &TransactionFingerprint,
        tolerance: Duration,
    ) -> Result<usize> {
        let mut guard = self
            .transactions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|t| t.is_confirmed() || !fingerprint.matches(t, tolerance));
        Ok(before - guard.len())
    }

    async fn remove_window(&self, account_id: i64, period: &Period) -> Result<usize> {
        let mut guard = self
            .transactions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|t| !(t.account_id == account_id && period.contains(t.timestamp)));
        Ok(before - guard.len())
    }

    async fn persist(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transactions::{Category, Direction, DEFAULT_FINGERPRINT_TOLERANCE_SECS};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn tx(id: TransactionId, account_id: i64, day: u32) -> Transaction {
        Transaction {
            id,
            account_id,
            category: Category {
                id: 1,
                name: "Salary".to_string(),
                emoji: "💰".to_string(),
                direction: Direction::Income,
            },
            amount: dec!(250),
            timestamp: Utc.with_ymd_and_hms(2025, 7, day, 12, 0, 0).unwrap(),
            comment: None,
        }
    }

    #[tokio::test]
    async fn insert_is_an_upsert() {
        let cache = InMemoryTransactionCache::new();
        let mut record = tx(TransactionId::Confirmed(1), 1, 5);
        cache.insert(record.clone()).await.unwrap();
        record.amount = dec!(300);
        cache.insert(record.clone()).await.unwrap();

        let all = cache.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].amount, dec!(300));
    }

    #[tokio::test]
    async fn update_ignores_unknown_ids() {
        let cache = InMemoryTransactionCache::new();
        cache.update(tx(TransactionId::Confirmed(9), 1, 5)).await.unwrap();
        assert!(cache.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_and_remove_only_hits_fingerprint_matches() {
        let optimistic = tx(TransactionId::new_local(), 1, 5);
        let unrelated = tx(TransactionId::Confirmed(2), 1, 6);
        let cache =
            InMemoryTransactionCache::with_transactions(vec![optimistic.clone(), unrelated.clone()]);

        let removed = cache
            .find_and_remove(
                &TransactionFingerprint::of(&optimistic),
                Duration::seconds(DEFAULT_FINGERPRINT_TOLERANCE_SECS),
            )
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(cache.all().await.unwrap(), vec![unrelated]);
    }

    #[tokio::test]
    async fn find_and_remove_keeps_confirmed_twins() {
        let optimistic = tx(TransactionId::new_local(), 1, 5);
        let mut twin = optimistic.clone();
        twin.id = TransactionId::Confirmed(4);
        let cache =
            InMemoryTransactionCache::with_transactions(vec![optimistic.clone(), twin.clone()]);

        let removed = cache
            .find_and_remove(
                &TransactionFingerprint::of(&optimistic),
                Duration::seconds(DEFAULT_FINGERPRINT_TOLERANCE_SECS),
            )
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(cache.all().await.unwrap(), vec![twin]);
    }

    #[tokio::test]
    async fn remove_window_is_scoped_to_account_and_period() {
        let inside = tx(TransactionId::Confirmed(1), 1, 10);
        let outside = tx(TransactionId::Confirmed(2), 1, 25);
        let other_account = tx(TransactionId::Confirmed(3), 2, 10);
        let cache = InMemoryTransactionCache::with_transactions(vec![
            inside,
            outside.clone(),
            other_account.clone(),
        ]);
        let period = Period::new(
            Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 7, 15, 0, 0, 0).unwrap(),
        )
        .unwrap();

        assert_eq!(cache.remove_window(1, &period).await.unwrap(), 1);
        assert_eq!(cache.all().await.unwrap(), vec![outside, other_account]);
    }
}
