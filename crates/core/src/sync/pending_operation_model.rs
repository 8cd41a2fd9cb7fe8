//! Pending-operation (offline backup) domain models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::transactions::{Transaction, TransactionId};

/// Write intents that can wait for the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAction {
    Create,
    Update,
    Delete,
}

/// Identifier of a pending operation, distinct from the transaction id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalOperationId(pub Uuid);

impl LocalOperationId {
    pub fn new() -> Self {
        LocalOperationId(Uuid::now_v7())
    }
}

impl Default for LocalOperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LocalOperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A write intent not yet confirmed by the ledger, with the transaction
/// snapshot taken at the time of the write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    pub local_id: LocalOperationId,
    pub action: PendingAction,
    pub transaction_id: TransactionId,
    /// `None` only for a delete of a record that was never cached; such an
    /// entry belongs to every account.
    pub account_id: Option<i64>,
    /// `None` exactly when `account_id` is.
    pub transaction: Option<Transaction>,
    /// Confirmed records that already matched a create's fingerprint when it
    /// was queued, or that another write of ours produced. None of them can
    /// be this create's ledger copy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prior_matches: Vec<TransactionId>,
    pub created_at: DateTime<Utc>,
}

impl PendingOperation {
    pub fn new(action: PendingAction, transaction: Transaction) -> Self {
        Self {
            local_id: LocalOperationId::new(),
            action,
            transaction_id: transaction.id,
            account_id: Some(transaction.account_id),
            transaction: Some(transaction),
            prior_matches: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn create(transaction: Transaction) -> Self {
        Self::new(PendingAction::Create, transaction)
    }

    pub fn update(transaction: Transaction) -> Self {
        Self::new(PendingAction::Update, transaction)
    }

    pub fn delete(transaction: Transaction) -> Self {
        Self::new(PendingAction::Delete, transaction)
    }

    /// Delete of a ledger record this client holds no copy of.
    pub fn delete_by_id(transaction_id: i64) -> Self {
        Self {
            local_id: LocalOperationId::new(),
            action: PendingAction::Delete,
            transaction_id: TransactionId::Confirmed(transaction_id),
            account_id: None,
            transaction: None,
            prior_matches: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_prior_matches(mut self, prior_matches: Vec<TransactionId>) -> Self {
        self.prior_matches = prior_matches;
        self
    }

    /// True when replaying or listing `account_id` must consider this entry.
    pub fn applies_to(&self, account_id: i64) -> bool {
        self.account_id.is_none() || self.account_id == Some(account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_action_serialization_is_stable() {
        let actual = [
            PendingAction::Create,
            PendingAction::Update,
            PendingAction::Delete,
        ]
        .iter()
        .map(|action| serde_json::to_string(action).expect("serialize action"))
        .collect::<Vec<_>>();

        assert_eq!(actual, vec!["\"create\"", "\"update\"", "\"delete\""]);
    }

    #[test]
    fn delete_by_id_applies_to_every_account() {
        let op = PendingOperation::delete_by_id(77);
        assert_eq!(op.transaction_id, TransactionId::Confirmed(77));
        assert!(op.transaction.is_none());
        assert!(op.applies_to(1));
        assert!(op.applies_to(2));

        let json = serde_json::to_value(&op).expect("serialize");
        assert!(json.get("priorMatches").is_none());
        let back: PendingOperation = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, op);
    }

    #[test]
    fn local_operation_ids_are_unique() {
        let first = LocalOperationId::new();
        let second = LocalOperationId::new();
        assert_ne!(first, second);
    }
}
