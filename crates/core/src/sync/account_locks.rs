use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per account.
///
/// Replay reads the pending log and writes it back later, so every
/// operation on an account must hold that account's guard for its whole
/// duration. Accounts never contend with each other.
#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, account_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(account_id).or_default())
        };
        lock.lock_owned().await
    }
}
