use log::info;

use super::transactions_traits::TransactionCacheTrait;
use crate::errors::Result;

/// Move every cached transaction from `source` into `target`.
///
/// The target is persisted before the source is cleared, so a failure part
/// way through leaves the records in at least one store. Returns the number
/// of records moved.
pub async fn migrate_transaction_cache(
    source: &dyn TransactionCacheTrait,
    target: &dyn TransactionCacheTrait,
) -> Result<usize> {
    let transactions = source.all().await?;
    if transactions.is_empty() {
        return Ok(0);
    }

    for transaction in &transactions {
        target.insert(transaction.clone()).await?;
    }
    target.persist().await?;

    for transaction in &transactions {
        source.remove(&transaction.id).await?;
    }
    source.persist().await?;

    info!("Migrated {} cached transactions", transactions.len());
    Ok(transactions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transactions::{
        Category, Direction, InMemoryTransactionCache, Transaction, TransactionId,
    };
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn migration_moves_every_record() {
        let records: Vec<Transaction> = (1..=3)
            .map(|i| Transaction {
                id: TransactionId::Confirmed(i),
                account_id: 1,
                category: Category {
                    id: 2,
                    name: "Cafe".to_string(),
                    emoji: "☕".to_string(),
                    direction: Direction::Outcome,
                },
                amount: dec!(4.50),
                timestamp: Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap(),
                comment: None,
            })
            .collect();
        let source = InMemoryTransactionCache::with_transactions(records.clone());
        let target = InMemoryTransactionCache::new();

        let moved = migrate_transaction_cache(&source, &target).await.unwrap();

        assert_eq!(moved, 3);
        assert!(source.all().await.unwrap().is_empty());
        assert_eq!(target.all().await.unwrap(), records);
    }

    #[tokio::test]
    async fn migrating_an_empty_cache_is_a_no_op() {
        let source = InMemoryTransactionCache::new();
        let target = InMemoryTransactionCache::new();
        assert_eq!(migrate_transaction_cache(&source, &target).await.unwrap(), 0);
    }
}
