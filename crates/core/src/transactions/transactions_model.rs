//! Transaction domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::errors::{Error, Result};

const LOCAL_ID_PREFIX: &str = "local:";

/// Money flow direction, derived from the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Income,
    Outcome,
}

impl Direction {
    pub fn from_is_income(is_income: bool) -> Self {
        if is_income {
            Direction::Income
        } else {
            Direction::Outcome
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// A single glyph; may span several code points.
    pub emoji: String,
    pub direction: Direction,
}

impl Category {
    pub fn is_income(&self) -> bool {
        self.direction == Direction::Income
    }
}

/// Identifier of a transaction.
///
/// `Confirmed` ids come from the remote ledger. `Local` ids are minted for
/// optimistic records written while the ledger was unreachable; they live in
/// a separate space so the two can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransactionId {
    Confirmed(i64),
    Local(Uuid),
}

impl TransactionId {
    /// Mint a fresh local id. UUID v7 keeps them time-ordered.
    pub fn new_local() -> Self {
        TransactionId::Local(Uuid::now_v7())
    }

    pub fn is_local(&self) -> bool {
        matches!(self, TransactionId::Local(_))
    }

    /// Server id, if the record was confirmed by the ledger.
    pub fn confirmed(&self) -> Option<i64> {
        match self {
            TransactionId::Confirmed(id) => Some(*id),
            TransactionId::Local(_) => None,
        }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionId::Confirmed(id) => write!(f, "{}", id),
            TransactionId::Local(uuid) => write!(f, "{}{}", LOCAL_ID_PREFIX, uuid),
        }
    }
}

impl FromStr for TransactionId {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        if let Some(raw) = value.strip_prefix(LOCAL_ID_PREFIX) {
            return Uuid::parse_str(raw)
                .map(TransactionId::Local)
                .map_err(|e| Error::Validation(format!("Invalid local id '{}': {}", value, e)));
        }
        value
            .parse::<i64>()
            .map(TransactionId::Confirmed)
            .map_err(|e| Error::Validation(format!("Invalid transaction id '{}': {}", value, e)))
    }
}

impl From<i64> for TransactionId {
    fn from(id: i64) -> Self {
        TransactionId::Confirmed(id)
    }
}

impl Serialize for TransactionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TransactionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Whether a record reflects the ledger or only a local intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Confirmed,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: i64,
    pub category: Category,
    /// Sign-free magnitude; the direction comes from the category.
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub comment: Option<String>,
}

impl Transaction {
    /// Build an optimistic record for a create that has not reached the ledger.
    pub fn optimistic(new_transaction: NewTransaction) -> Self {
        Transaction {
            id: TransactionId::new_local(),
            account_id: new_transaction.account_id,
            category: new_transaction.category,
            amount: new_transaction.amount,
            timestamp: new_transaction.timestamp,
            comment: normalize_comment(new_transaction.comment),
        }
    }

    pub fn direction(&self) -> Direction {
        self.category.direction
    }

    pub fn provenance(&self) -> Provenance {
        if self.id.is_local() {
            Provenance::Pending
        } else {
            Provenance::Confirmed
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.provenance() == Provenance::Confirmed
    }

    pub fn validate(&self) -> Result<()> {
        validate_amount(self.amount)
    }

    /// The create request that would reproduce this record on the ledger.
    pub fn to_new_transaction(&self) -> NewTransaction {
        NewTransaction {
            account_id: self.account_id,
            category: self.category.clone(),
            amount: self.amount,
            timestamp: self.timestamp,
            comment: self.comment.clone(),
        }
    }
}

/// Input model for creating a new transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub account_id: i64,
    pub category: Category,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub comment: Option<String>,
}

impl NewTransaction {
    pub fn new(
        account_id: i64,
        category: Category,
        amount: Decimal,
        timestamp: DateTime<Utc>,
        comment: Option<String>,
    ) -> Self {
        Self {
            account_id,
            category,
            amount,
            timestamp,
            comment: normalize_comment(comment),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_amount(self.amount)
    }
}

fn validate_amount(amount: Decimal) -> Result<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(Error::Validation(format!(
            "Transaction amount must be non-negative, got {}",
            amount
        )));
    }
    Ok(())
}

/// Blank comments are treated as absent.
pub fn normalize_comment(comment: Option<String>) -> Option<String> {
    comment.filter(|c| !c.trim().is_empty())
}

/// Inclusive UTC date-time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(Error::Validation(format!(
                "Period start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}
