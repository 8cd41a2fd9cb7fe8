//! Natural-key matching between optimistic and ledger-confirmed records.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::transactions_model::{normalize_comment, Transaction};

/// Timestamps closer than this are considered the same moment.
pub const DEFAULT_FINGERPRINT_TOLERANCE_SECS: i64 = 60;

/// Everything that identifies a transaction except its id.
///
/// An optimistic record and its confirmed counterpart carry different ids, so
/// reconciliation falls back to (account, category, amount, timestamp within
/// tolerance, comment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFingerprint {
    pub account_id: i64,
    pub category_id: i64,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub comment: Option<String>,
}

impl TransactionFingerprint {
    pub fn of(transaction: &Transaction) -> Self {
        Self {
            account_id: transaction.account_id,
            category_id: transaction.category.id,
            amount: transaction.amount,
            timestamp: transaction.timestamp,
            comment: normalize_comment(transaction.comment.clone()),
        }
    }

    /// Inclusive bounds of the timestamp range a match can fall into.
    pub fn timestamp_bounds(&self, tolerance: Duration) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.timestamp - tolerance, self.timestamp + tolerance)
    }

    pub fn matches(&self, transaction: &Transaction, tolerance: Duration) -> bool {
        if transaction.account_id != self.account_id
            || transaction.category.id != self.category_id
            // Decimal equality is numeric: 1000 == 1000.00
            || transaction.amount != self.amount
        {
            return false;
        }
        if (transaction.timestamp - self.timestamp).abs() >= tolerance {
            return false;
        }
        normalize_comment(transaction.comment.clone()) == self.comment
    }
}
