//! Database model for pending operations.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ledger_sync_core::errors::{DatabaseError, Error, Result};
use ledger_sync_core::sync::{LocalOperationId, PendingAction, PendingOperation};
use ledger_sync_core::transactions::{Transaction, TransactionId};

use crate::transactions::{timestamp_from_db, timestamp_to_db};

fn action_to_db(action: PendingAction) -> Result<String> {
    Ok(serde_json::to_string(&action)?.trim_matches('"').to_string())
}

fn action_from_db(value: &str) -> Result<PendingAction> {
    Ok(serde_json::from_str(&format!("\"{}\"", value))?)
}

/// Everything of an entry that has no column of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingPayload {
    transaction_id: TransactionId,
    #[serde(default)]
    transaction: Option<Transaction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    prior_matches: Vec<TransactionId>,
}

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(primary_key(local_id))]
#[diesel(table_name = crate::schema::pending_operations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PendingOperationDB {
    pub local_id: String,
    /// Log position; assigned on insert.
    pub seq: i64,
    /// `NULL` for entries that belong to every account.
    pub account_id: Option<i64>,
    pub action: String,
    /// Target id, snapshot and prior matches as JSON.
    pub payload: String,
    pub created_at: String,
}

impl PendingOperationDB {
    pub fn from_operation(operation: &PendingOperation, seq: i64) -> Result<Self> {
        let payload = PendingPayload {
            transaction_id: operation.transaction_id,
            transaction: operation.transaction.clone(),
            prior_matches: operation.prior_matches.clone(),
        };
        Ok(Self {
            local_id: operation.local_id.to_string(),
            seq,
            account_id: operation.account_id,
            action: action_to_db(operation.action)?,
            payload: serde_json::to_string(&payload)?,
            created_at: timestamp_to_db(operation.created_at),
        })
    }
}

impl TryFrom<PendingOperationDB> for PendingOperation {
    type Error = Error;

    fn try_from(row: PendingOperationDB) -> Result<Self> {
        let local_id = Uuid::parse_str(&row.local_id).map_err(|e| {
            Error::Database(DatabaseError::Internal(format!(
                "Invalid pending operation id '{}': {}",
                row.local_id, e
            )))
        })?;
        let payload: PendingPayload = serde_json::from_str(&row.payload)?;
        Ok(PendingOperation {
            local_id: LocalOperationId(local_id),
            action: action_from_db(&row.action)?,
            transaction_id: payload.transaction_id,
            account_id: row.account_id,
            transaction: payload.transaction,
            prior_matches: payload.prior_matches,
            created_at: timestamp_from_db(&row.created_at)?,
        })
    }
}
