use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use super::pending_operation_model::{LocalOperationId, PendingOperation};
use super::sync_traits::PendingOperationLogTrait;
use crate::errors::Result;

/// Process-lifetime pending-operations log. `persist` is a no-op.
#[derive(Debug, Default)]
pub struct InMemoryPendingOperationLog {
    operations: RwLock<Vec<PendingOperation>>,
}

impl InMemoryPendingOperationLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingOperationLogTrait for InMemoryPendingOperationLog {
    async fn all(&self) -> Result<Vec<PendingOperation>> {
        let guard = self
            .operations
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    async fn insert(&self, operation: PendingOperation) -> Result<()> {
        let mut guard = self
            .operations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.push(operation);
        Ok(())
    }

    async fn update(&self, operation: PendingOperation) -> Result<()> {
        let mut guard = self
            .operations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = guard
            .iter_mut()
            .find(|op| op.local_id == operation.local_id)
        {
            *existing = operation;
        }
        Ok(())
    }

    async fn remove(&self, local_id: &LocalOperationId) -> Result<()> {
        let mut guard = self
            .operations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.retain(|op| &op.local_id != local_id);
        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        Ok(())
    }
}
