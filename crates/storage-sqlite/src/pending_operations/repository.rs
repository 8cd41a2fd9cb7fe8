use std::sync::Arc;

use async_trait::async_trait;
use diesel::dsl::max;
use diesel::prelude::*;
use diesel::SqliteConnection;

use ledger_sync_core::sync::{LocalOperationId, PendingOperation, PendingOperationLogTrait};
use ledger_sync_core::Result;

use super::model::PendingOperationDB;
use crate::db::{checkpoint, get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::pending_operations;

/// Durable write-intent log. Entries come back in insertion order.
pub struct SqlitePendingOperationLog {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SqlitePendingOperationLog {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    pub fn load_all_impl(&self) -> Result<Vec<PendingOperation>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = pending_operations::table
            .order(pending_operations::seq.asc())
            .load::<PendingOperationDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(PendingOperation::try_from).collect()
    }
}

#[async_trait]
impl PendingOperationLogTrait for SqlitePendingOperationLog {
    async fn all(&self) -> Result<Vec<PendingOperation>> {
        self.load_all_impl()
    }

    async fn insert(&self, operation: PendingOperation) -> Result<()> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let last_seq = pending_operations::table
                    .select(max(pending_operations::seq))
                    .first::<Option<i64>>(conn)
                    .map_err(StorageError::from)?;
                let row =
                    PendingOperationDB::from_operation(&operation, last_seq.unwrap_or(0) + 1)?;

                diesel::insert_into(pending_operations::table)
                    .values(&row)
                    .on_conflict(pending_operations::local_id)
                    .do_nothing()
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn update(&self, operation: PendingOperation) -> Result<()> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let key = operation.local_id.to_string();
                let seq = pending_operations::table
                    .find(&key)
                    .select(pending_operations::seq)
                    .first::<i64>(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                let Some(seq) = seq else {
                    return Ok(());
                };
                let row = PendingOperationDB::from_operation(&operation, seq)?;
                diesel::update(pending_operations::table.find(key))
                    .set((
                        pending_operations::account_id.eq(row.account_id),
                        pending_operations::action.eq(row.action),
                        pending_operations::payload.eq(row.payload),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn remove(&self, local_id: &LocalOperationId) -> Result<()> {
        let key = local_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::delete(pending_operations::table.find(key))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn persist(&self) -> Result<()> {
        checkpoint(&self.pool)
    }
}
