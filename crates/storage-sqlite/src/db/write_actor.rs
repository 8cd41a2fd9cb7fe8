//! Single writer thread for SQLite.
//!
//! SQLite allows one writer at a time. All mutations are funnelled through one
//! dedicated connection, each job in its own `BEGIN IMMEDIATE` transaction, so
//! writers never race for the lock and a failing job rolls back completely.

use diesel::SqliteConnection;
use log::{debug, error};
use tokio::sync::{mpsc, oneshot};

use ledger_sync_core::errors::{DatabaseError, Error, Result};

use super::DbPool;
use crate::errors::StorageError;

type WriteJob = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

/// Cloneable handle for submitting jobs to the writer thread.
#[derive(Clone, Debug)]
pub struct WriteHandle {
    sender: mpsc::UnboundedSender<WriteJob>,
}

fn writer_stopped() -> Error {
    Error::Database(DatabaseError::Internal(
        "Database writer has stopped".to_string(),
    ))
}

impl WriteHandle {
    /// Run `job` inside an immediate transaction on the writer connection.
    ///
    /// An `Err` from the job rolls the transaction back.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel::<Result<T>>();
        let wrapped: WriteJob = Box::new(move |conn: &mut SqliteConnection| {
            let result = conn
                .immediate_transaction::<T, StorageError, _>(|tx_conn| {
                    job(tx_conn).map_err(|e| StorageError::Core(Box::new(e)))
                })
                .map_err(Error::from);
            let _ = reply_tx.send(result);
        });

        self.sender.send(wrapped).map_err(|_| writer_stopped())?;
        reply_rx.await.map_err(|_| writer_stopped())?
    }
}

/// Start the writer thread on a connection taken from `pool`.
pub fn spawn_writer(pool: DbPool) -> Result<WriteHandle> {
    let mut conn = pool.get().map_err(StorageError::from)?;
    let (sender, mut receiver) = mpsc::unbounded_channel::<WriteJob>();

    std::thread::Builder::new()
        .name("sqlite-writer".to_string())
        .spawn(move || {
            debug!("SQLite writer started");
            while let Some(job) = receiver.blocking_recv() {
                job(&mut *conn);
            }
            debug!("SQLite writer stopped");
        })
        .map_err(|e| {
            error!("Failed to start SQLite writer: {}", e);
            StorageError::from(e)
        })?;

    Ok(WriteHandle { sender })
}
