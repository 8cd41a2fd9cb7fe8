//! Wire types for the ledger REST API.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use ledger_sync_core::transactions::{
    normalize_comment, Category, Direction, NewTransaction, Transaction, TransactionId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerClientError, Result};

/// Glyph used when the ledger sends a category without an emoji.
const DEFAULT_EMOJI: &str = " ";

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

/// Body of `POST /transactions` and `PUT /transactions/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub account_id: i64,
    pub category_id: i64,
    pub amount: String,
    /// RFC 3339, UTC, whole seconds.
    pub transaction_date: String,
    pub comment: Option<String>,
}

impl From<&NewTransaction> for TransactionRequest {
    fn from(tx: &NewTransaction) -> Self {
        Self {
            account_id: tx.account_id,
            category_id: tx.category.id,
            amount: tx.amount.to_string(),
            transaction_date: format_transaction_date(tx.timestamp),
            comment: normalize_comment(tx.comment.clone()),
        }
    }
}

impl From<&Transaction> for TransactionRequest {
    fn from(tx: &Transaction) -> Self {
        Self::from(&tx.to_new_transaction())
    }
}

pub fn format_transaction_date(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ─────────────────────────────────────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAccountDto {
    pub id: i64,
    pub name: String,
    pub balance: String,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCategoryDto {
    pub id: i64,
    pub name: String,
    pub emoji: String,
    pub is_income: bool,
}

impl TransactionCategoryDto {
    pub fn into_domain(self) -> Category {
        let emoji = if self.emoji.is_empty() {
            DEFAULT_EMOJI.to_string()
        } else {
            self.emoji
        };
        Category {
            id: self.id,
            name: self.name,
            emoji,
            direction: Direction::from_is_income(self.is_income),
        }
    }
}

/// A transaction as the ledger returns it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: i64,
    pub account: TransactionAccountDto,
    pub category: TransactionCategoryDto,
    pub amount: String,
    pub transaction_date: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl TransactionResponse {
    /// Map to the domain model. Fails when the amount or date is unparsable.
    pub fn into_domain(self) -> Result<Transaction> {
        let amount = Decimal::from_str(self.amount.trim()).map_err(|e| {
            LedgerClientError::decode(format!(
                "Transaction {} has invalid amount {:?}: {}",
                self.id, self.amount, e
            ))
        })?;
        let timestamp = parse_transaction_date(&self.transaction_date).ok_or_else(|| {
            LedgerClientError::decode(format!(
                "Transaction {} has invalid date {:?}",
                self.id, self.transaction_date
            ))
        })?;

        Ok(Transaction {
            id: TransactionId::Confirmed(self.id),
            account_id: self.account.id,
            category: self.category.into_domain(),
            amount,
            timestamp,
            comment: normalize_comment(self.comment),
        })
    }
}

/// Accepts RFC 3339 with or without fractional seconds.
pub fn parse_transaction_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Error body the ledger sends with non-success responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorResponse {
    pub fn describe(&self) -> Option<String> {
        match (&self.error, &self.message) {
            (Some(error), Some(message)) => Some(format!("{}: {}", error, message)),
            (None, Some(message)) => Some(message.clone()),
            (Some(error), None) => Some(error.clone()),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn response_json(amount: &str, date: &str, comment: &str, emoji: &str) -> String {
        format!(
            r#"{{"id":17,"account":{{"id":1,"name":"Main","balance":"1000.00","currency":"RUB"}},"category":{{"id":3,"name":"Groceries","emoji":"{}","isIncome":false}},"amount":"{}","transactionDate":"{}","comment":{},"createdAt":"2025-07-19T10:00:00.000Z","updatedAt":"2025-07-19T10:00:00.000Z"}}"#,
            emoji, amount, date, comment
        )
    }

    #[test]
    fn response_maps_to_confirmed_transaction() {
        let json = response_json("1000.50", "2025-07-19T10:00:00.123Z", r#""lunch""#, "🛒");
        let response: TransactionResponse = serde_json::from_str(&json).unwrap();
        let tx = response.into_domain().unwrap();

        assert_eq!(tx.id, TransactionId::Confirmed(17));
        assert_eq!(tx.account_id, 1);
        assert_eq!(tx.amount, dec!(1000.50));
        assert_eq!(tx.direction(), Direction::Outcome);
        assert_eq!(tx.category.emoji, "🛒");
        assert_eq!(tx.comment.as_deref(), Some("lunch"));
        assert_eq!(
            tx.timestamp,
            Utc.with_ymd_and_hms(2025, 7, 19, 10, 0, 0).unwrap()
                + chrono::Duration::milliseconds(123)
        );
    }

    #[test]
    fn empty_comment_and_emoji_are_normalized() {
        let json = response_json("5", "2025-07-19T10:00:00Z", r#""""#, "");
        let tx: Transaction = serde_json::from_str::<TransactionResponse>(&json)
            .unwrap()
            .into_domain()
            .unwrap();
        assert_eq!(tx.comment, None);
        assert_eq!(tx.category.emoji, " ");
    }

    #[test]
    fn unparsable_amount_or_date_is_a_decode_error() {
        for (amount, date) in [("lots", "2025-07-19T10:00:00Z"), ("5", "19.07.2025")] {
            let json = response_json(amount, date, "null", "🛒");
            let response: TransactionResponse = serde_json::from_str(&json).unwrap();
            assert!(matches!(
                response.into_domain(),
                Err(LedgerClientError::Decode(_))
            ));
        }
    }

    #[test]
    fn request_uses_plain_amount_and_whole_second_utc_date() {
        let new_tx = NewTransaction::new(
            1,
            Category {
                id: 3,
                name: "Groceries".to_string(),
                emoji: "🛒".to_string(),
                direction: Direction::Outcome,
            },
            dec!(1000.50),
            Utc.with_ymd_and_hms(2025, 7, 19, 10, 0, 0).unwrap()
                + chrono::Duration::milliseconds(999),
            None,
        );
        let body = serde_json::to_value(TransactionRequest::from(&new_tx)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "accountId": 1,
                "categoryId": 3,
                "amount": "1000.50",
                "transactionDate": "2025-07-19T10:00:00Z",
                "comment": null
            })
        );
    }
}
