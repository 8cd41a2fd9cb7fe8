//! Database model for cached transactions.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledger_sync_core::errors::{DatabaseError, Error, Result};
use ledger_sync_core::transactions::{Category, Direction, Transaction, TransactionId};

/// Fixed-width RFC 3339 so text order matches time order.
pub fn timestamp_to_db(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn timestamp_from_db(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            Error::Database(DatabaseError::Internal(format!(
                "Invalid stored timestamp '{}': {}",
                value, e
            )))
        })
}

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::cached_transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct CachedTransactionDB {
    pub id: String,
    pub account_id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub category_emoji: String,
    pub category_is_income: bool,
    pub amount: String,
    pub transaction_date: String,
    pub comment: Option<String>,
}

impl From<&Transaction> for CachedTransactionDB {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id.to_string(),
            account_id: tx.account_id,
            category_id: tx.category.id,
            category_name: tx.category.name.clone(),
            category_emoji: tx.category.emoji.clone(),
            category_is_income: tx.category.is_income(),
            amount: tx.amount.to_string(),
            transaction_date: timestamp_to_db(tx.timestamp),
            comment: tx.comment.clone(),
        }
    }
}

impl TryFrom<CachedTransactionDB> for Transaction {
    type Error = Error;

    fn try_from(row: CachedTransactionDB) -> Result<Self> {
        let id = TransactionId::from_str(&row.id)?;
        let amount = Decimal::from_str(&row.amount).map_err(|e| {
            Error::Database(DatabaseError::Internal(format!(
                "Invalid stored amount '{}' for transaction {}: {}",
                row.amount, row.id, e
            )))
        })?;
        Ok(Transaction {
            id,
            account_id: row.account_id,
            category: Category {
                id: row.category_id,
                name: row.category_name,
                emoji: row.category_emoji,
                direction: Direction::from_is_income(row.category_is_income),
            },
            amount,
            timestamp: timestamp_from_db(&row.transaction_date)?,
            comment: row.comment,
        })
    }
}
