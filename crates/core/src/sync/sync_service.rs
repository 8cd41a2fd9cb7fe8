use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};

use super::account_locks::AccountLocks;
use super::pending_operation_model::{LocalOperationId, PendingAction, PendingOperation};
use super::replay_plan::{plan_replay, PlannedOperation};
use super::retry_policy::ReplayReport;
use super::sync_config::SyncConfig;
use super::sync_traits::{PendingOperationLogTrait, TransactionSyncServiceTrait};
use crate::errors::{DatabaseError, Error, RemoteError, Result};
use crate::transactions::{
    Direction, LedgerClientTrait, LedgerWindow, NewTransaction, Period, RemoteResult, Transaction,
    TransactionCacheTrait, TransactionFingerprint, TransactionId,
};

fn snapshot_of(operation: &PendingOperation) -> Result<&Transaction> {
    operation.transaction.as_ref().ok_or_else(|| {
        Error::Database(DatabaseError::Internal(format!(
            "Pending {:?} {} carries no transaction snapshot",
            operation.action, operation.local_id
        )))
    })
}

/// Result of a replay pass, including the records the ledger confirmed.
struct ReplayPass {
    report: ReplayReport,
    confirmed: Vec<Transaction>,
}

enum ReplayStep {
    Resolved,
    Confirmed(Transaction),
    Blocked,
    Failed(RemoteError),
}

/// Keeps the local transaction cache consistent with the remote ledger.
///
/// Writes try the ledger once and fall back to the pending log plus an
/// optimistic cache change. Reads drain the pending log, then replace the
/// requested window with the ledger's copy, or merge the cache with the
/// pending log when the ledger cannot be read.
pub struct TransactionSyncService {
    ledger: Arc<dyn LedgerClientTrait>,
    cache: Arc<dyn TransactionCacheTrait>,
    pending_log: Arc<dyn PendingOperationLogTrait>,
    config: SyncConfig,
    account_locks: AccountLocks,
}

impl TransactionSyncService {
    pub fn new(
        ledger: Arc<dyn LedgerClientTrait>,
        cache: Arc<dyn TransactionCacheTrait>,
        pending_log: Arc<dyn PendingOperationLogTrait>,
    ) -> Self {
        Self {
            ledger,
            cache,
            pending_log,
            config: SyncConfig::default(),
            account_locks: AccountLocks::new(),
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Bound a ledger call by the configured timeout.
    async fn call_ledger<T, F>(&self, call: F) -> RemoteResult<T>
    where
        F: Future<Output = RemoteResult<T>> + Send,
    {
        match tokio::time::timeout(self.config.remote_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout),
        }
    }

    async fn pending_for_account(&self, account_id: i64) -> Result<Vec<PendingOperation>> {
        Ok(self
            .pending_log
            .all()
            .await?
            .into_iter()
            .filter(|op| op.applies_to(account_id))
            .collect())
    }

    async fn pending_for_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Vec<PendingOperation>> {
        Ok(self
            .pending_log
            .all()
            .await?
            .into_iter()
            .filter(|op| &op.transaction_id == transaction_id)
            .collect())
    }

    async fn remove_pending(&self, local_ids: &[LocalOperationId]) -> Result<()> {
        for local_id in local_ids {
            self.pending_log.remove(local_id).await?;
        }
        Ok(())
    }

    /// Confirmed records of the same account that `transaction` already
    /// matches by fingerprint.
    async fn confirmed_matches(&self, transaction: &Transaction) -> Result<Vec<TransactionId>> {
        let fingerprint = TransactionFingerprint::of(transaction);
        let tolerance = self.config.fingerprint_tolerance;
        Ok(self
            .cache
            .all()
            .await?
            .into_iter()
            .filter(|t| {
                t.account_id == transaction.account_id
                    && t.is_confirmed()
                    && fingerprint.matches(t, tolerance)
            })
            .map(|t| t.id)
            .collect())
    }

    /// Tell queued creates that `confirmed` came from another write, so
    /// replay never mistakes it for their own ledger copy.
    async fn note_prior_match(
        &self,
        confirmed: &Transaction,
        source: &LocalOperationId,
    ) -> Result<()> {
        let tolerance = self.config.fingerprint_tolerance;
        for mut op in self.pending_for_account(confirmed.account_id).await? {
            if op.action != PendingAction::Create
                || &op.local_id == source
                || op.prior_matches.contains(&confirmed.id)
            {
                continue;
            }
            let matches = op
                .transaction
                .as_ref()
                .is_some_and(|t| TransactionFingerprint::of(t).matches(confirmed, tolerance));
            if matches {
                debug!(
                    "Pending create {} will not be resolved by {}",
                    op.local_id, confirmed.id
                );
                op.prior_matches.push(confirmed.id);
                self.pending_log.update(op).await?;
            }
        }
        Ok(())
    }

    /// Record the intent and its optimistic effect before the ledger is asked.
    async fn record_intent(
        &self,
        operation: &PendingOperation,
        superseded: &[LocalOperationId],
    ) -> Result<()> {
        self.pending_log.insert(operation.clone()).await?;
        self.remove_pending(superseded).await?;
        match operation.action {
            PendingAction::Create | PendingAction::Update => {
                self.cache.insert(snapshot_of(operation)?.clone()).await?;
            }
            PendingAction::Delete => {
                self.cache.remove(&operation.transaction_id).await?;
            }
        }
        self.pending_log.persist().await?;
        self.cache.persist().await
    }

    /// Replace an optimistic record with the ledger's copy and clear its intent.
    async fn settle_confirmed(
        &self,
        local_id: &LocalOperationId,
        replaced: &TransactionId,
        confirmed: &Transaction,
    ) -> Result<()> {
        self.pending_log.remove(local_id).await?;
        self.note_prior_match(confirmed, local_id).await?;
        if replaced != &confirmed.id {
            self.cache.remove(replaced).await?;
        }
        self.cache.insert(confirmed.clone()).await?;
        self.pending_log.persist().await?;
        self.cache.persist().await
    }

    async fn replay_locked(&self, account_id: i64) -> Result<ReplayPass> {
        let snapshot = self.pending_for_account(account_id).await?;
        let mut report = ReplayReport {
            ledger_reachable: true,
            ..Default::default()
        };
        if snapshot.is_empty() {
            return Ok(ReplayPass {
                report,
                confirmed: Vec::new(),
            });
        }

        let total = snapshot.len();
        let plan = plan_replay(snapshot);
        debug!(
            "Replay plan for account {}: {} calls, {} superseded of {} pending",
            account_id,
            plan.replay.len(),
            plan.superseded.len(),
            total
        );
        report.superseded_count = plan.superseded.len();

        // Confirmed records already in the cache. A queued create matching one
        // that is not among its prior matches reached the ledger on an
        // earlier attempt.
        let mut known_confirmed: Vec<Transaction> = Vec::new();
        if plan
            .replay
            .iter()
            .any(|p| p.operation.action == PendingAction::Create)
        {
            known_confirmed = self
                .cache
                .all()
                .await?
                .into_iter()
                .filter(|t| t.account_id == account_id && t.is_confirmed())
                .collect();
        }
        let mut claimed: HashSet<TransactionId> = HashSet::new();

        let mut resolved: Vec<LocalOperationId> = plan.superseded.clone();
        let mut confirmed: Vec<Transaction> = Vec::new();
        let mut cache_dirty = false;

        for planned in plan.replay {
            let step = self
                .replay_one(&planned, &known_confirmed, &mut claimed)
                .await?;
            let PlannedOperation { operation, folded } = planned;
            let settled = match step {
                ReplayStep::Resolved => true,
                ReplayStep::Confirmed(record) => {
                    self.note_prior_match(&record, &operation.local_id).await?;
                    confirmed.push(record);
                    true
                }
                ReplayStep::Blocked => false,
                ReplayStep::Failed(err) => {
                    report.failed_count += 1;
                    warn!(
                        "Replay of pending {:?} {} (transaction {}, account {}) failed [{}]: {}",
                        operation.action,
                        operation.local_id,
                        operation.transaction_id,
                        account_id,
                        err.retry_class().code(),
                        err
                    );
                    if err.is_unreachable() {
                        report.ledger_reachable = false;
                        break;
                    }
                    false
                }
            };
            if settled {
                if operation.action == PendingAction::Create {
                    cache_dirty = true;
                }
                report.replayed_count += 1;
                resolved.push(operation.local_id);
                resolved.extend(folded);
            }
        }

        self.remove_pending(&resolved).await?;
        if !resolved.is_empty() {
            self.pending_log.persist().await?;
        }
        if cache_dirty {
            self.cache.persist().await?;
        }
        report.remaining_count = total - resolved.len();

        if report.replayed_count > 0 || report.superseded_count > 0 {
            info!(
                "Replayed {} pending operations for account {} ({} superseded, {} remaining)",
                report.replayed_count,
                account_id,
                report.superseded_count,
                report.remaining_count
            );
        }
        Ok(ReplayPass { report, confirmed })
    }

    async fn replay_one(
        &self,
        planned: &PlannedOperation,
        known_confirmed: &[Transaction],
        claimed: &mut HashSet<TransactionId>,
    ) -> Result<ReplayStep> {
        let operation = &planned.operation;
        let tolerance = self.config.fingerprint_tolerance;

        match operation.action {
            PendingAction::Create => {
                let transaction = snapshot_of(operation)?;
                let fingerprint = TransactionFingerprint::of(transaction);
                if let Some(existing) = known_confirmed.iter().find(|t| {
                    !claimed.contains(&t.id)
                        && !operation.prior_matches.contains(&t.id)
                        && fingerprint.matches(t, tolerance)
                }) {
                    debug!(
                        "Pending create {} already on the ledger as {}",
                        operation.local_id, existing.id
                    );
                    claimed.insert(existing.id);
                    self.note_prior_match(existing, &operation.local_id).await?;
                    self.cache.remove(&transaction.id).await?;
                    return Ok(ReplayStep::Resolved);
                }

                match self
                    .call_ledger(
                        self.ledger
                            .create_transaction(&transaction.to_new_transaction()),
                    )
                    .await
                {
                    Ok(record) => {
                        // The window fetch re-ingests the ledger's copy.
                        // Only optimistic records are swept here.
                        self.cache.find_and_remove(&fingerprint, tolerance).await?;
                        self.cache.remove(&transaction.id).await?;
                        Ok(ReplayStep::Confirmed(record))
                    }
                    Err(err) => Ok(ReplayStep::Failed(err)),
                }
            }
            PendingAction::Update => {
                let transaction = snapshot_of(operation)?;
                if transaction.id.is_local() {
                    return Ok(ReplayStep::Blocked);
                }
                match self
                    .call_ledger(self.ledger.update_transaction(transaction))
                    .await
                {
                    Ok(_) => Ok(ReplayStep::Resolved),
                    Err(err) => Ok(ReplayStep::Failed(err)),
                }
            }
            PendingAction::Delete => {
                let Some(remote_id) = operation.transaction_id.confirmed() else {
                    return Ok(ReplayStep::Resolved);
                };
                match self
                    .call_ledger(self.ledger.delete_transaction(remote_id))
                    .await
                {
                    Ok(()) => Ok(ReplayStep::Resolved),
                    Err(err) if err.is_not_found() => Ok(ReplayStep::Resolved),
                    Err(err) => Ok(ReplayStep::Failed(err)),
                }
            }
        }
    }

    /// Replace the window with the ledger's copy, keeping optimistic records
    /// whose creates are still queued and cached copies of records the
    /// ledger listed but sent undecodable.
    async fn apply_authoritative_window(
        &self,
        account_id: i64,
        period: &Period,
        window: LedgerWindow,
        unresolved: &[PendingOperation],
    ) -> Result<()> {
        let mut kept: Vec<Transaction> = Vec::new();
        for remote_id in &window.undecodable_ids {
            if let Some(cached) = self.cache.get(&TransactionId::Confirmed(*remote_id)).await? {
                if cached.account_id == account_id {
                    kept.push(cached);
                }
            }
        }
        if !window.undecodable_ids.is_empty() {
            warn!(
                "Ledger sent {} undecodable records for account {}; kept {} cached copies",
                window.undecodable_ids.len(),
                account_id,
                kept.len()
            );
        }

        let removed = self.cache.remove_window(account_id, period).await?;
        let fetched_count = window.transactions.len();
        for record in window
            .transactions
            .into_iter()
            .filter(|t| t.account_id == account_id)
        {
            self.cache.insert(record).await?;
        }
        for record in kept {
            self.cache.insert(record).await?;
        }
        for op in unresolved
            .iter()
            .filter(|op| op.transaction_id.is_local() && op.action != PendingAction::Delete)
        {
            if let Some(snapshot) = &op.transaction {
                self.cache.insert(snapshot.clone()).await?;
            }
        }
        self.cache.persist().await?;
        info!(
            "Refreshed account {} window {}..{}: {} cached records replaced by {} from ledger",
            account_id, period.start, period.end, removed, fetched_count
        );
        Ok(())
    }
}

/// Cache contents overlaid with unresolved intents, filtered and ordered.
///
/// Creates and updates win over cached copies with the same id (log order,
/// last write wins); deletes hide the record.
fn merge_view(
    cached: Vec<Transaction>,
    unresolved: &[PendingOperation],
    account_id: i64,
    direction: Direction,
    period: &Period,
) -> Vec<Transaction> {
    let mut by_id: HashMap<TransactionId, Transaction> = cached
        .into_iter()
        .filter(|t| t.account_id == account_id)
        .map(|t| (t.id, t))
        .collect();

    for op in unresolved.iter().filter(|op| op.applies_to(account_id)) {
        match (op.action, &op.transaction) {
            (PendingAction::Delete, _) => {
                by_id.remove(&op.transaction_id);
            }
            (PendingAction::Create | PendingAction::Update, Some(snapshot)) => {
                by_id.insert(snapshot.id, snapshot.clone());
            }
            (PendingAction::Create | PendingAction::Update, None) => {}
        }
    }

    let mut view: Vec<Transaction> = by_id
        .into_values()
        .filter(|t| t.direction() == direction && period.contains(t.timestamp))
        .collect();
    view.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.id.cmp(&b.id))
    });
    view
}

#[async_trait]
impl TransactionSyncServiceTrait for TransactionSyncService {
    async fn list_transactions(
        &self,
        account_id: i64,
        direction: Direction,
        period: &Period,
    ) -> Result<Vec<Transaction>> {
        let _guard = self.account_locks.lock(account_id).await;

        let pass = self.replay_locked(account_id).await?;
        let unresolved = self.pending_for_account(account_id).await?;

        match self
            .call_ledger(self.ledger.list_transactions(account_id, period))
            .await
        {
            Ok(window) => {
                self.apply_authoritative_window(account_id, period, window, &unresolved)
                    .await?;
            }
            Err(err) => {
                warn!(
                    "Ledger window fetch for account {} failed [{}], serving local view: {}",
                    account_id,
                    err.retry_class().code(),
                    err
                );
                if !pass.confirmed.is_empty() {
                    for record in pass.confirmed {
                        self.cache.insert(record).await?;
                    }
                    self.cache.persist().await?;
                }
            }
        }

        let cached = self.cache.all().await?;
        Ok(merge_view(
            cached,
            &unresolved,
            account_id,
            direction,
            period,
        ))
    }

    async fn create_transaction(&self, new_transaction: NewTransaction) -> Result<Transaction> {
        new_transaction.validate()?;
        let _guard = self.account_locks.lock(new_transaction.account_id).await;

        let optimistic = Transaction::optimistic(new_transaction);
        let prior_matches = self.confirmed_matches(&optimistic).await?;
        let operation =
            PendingOperation::create(optimistic.clone()).with_prior_matches(prior_matches);
        self.record_intent(&operation, &[]).await?;

        match self
            .call_ledger(
                self.ledger
                    .create_transaction(&optimistic.to_new_transaction()),
            )
            .await
        {
            Ok(confirmed) => {
                self.settle_confirmed(&operation.local_id, &optimistic.id, &confirmed)
                    .await?;
                debug!("Created transaction {}", confirmed.id);
                Ok(confirmed)
            }
            Err(err) => {
                warn!(
                    "Create for account {} queued as {} [{}]: {}",
                    optimistic.account_id,
                    operation.local_id,
                    err.retry_class().code(),
                    err
                );
                Ok(optimistic)
            }
        }
    }

    async fn update_transaction(&self, transaction: Transaction) -> Result<Transaction> {
        transaction.validate()?;
        let _guard = self.account_locks.lock(transaction.account_id).await;

        let earlier = self.pending_for_transaction(&transaction.id).await?;

        if transaction.id.is_local() {
            // The ledger has never seen this record; the edit rewrites its
            // queued create.
            if !earlier
                .iter()
                .any(|op| op.action != PendingAction::Delete)
            {
                return Err(Error::NotFound(format!(
                    "No pending create for optimistic transaction {}",
                    transaction.id
                )));
            }
            let superseded: Vec<LocalOperationId> =
                earlier.iter().map(|op| op.local_id).collect();
            let mut prior_matches = self.confirmed_matches(&transaction).await?;
            for matched in earlier.iter().flat_map(|op| op.prior_matches.iter()) {
                if !prior_matches.contains(matched) {
                    prior_matches.push(*matched);
                }
            }
            let operation =
                PendingOperation::create(transaction.clone()).with_prior_matches(prior_matches);
            self.record_intent(&operation, &superseded).await?;

            return match self
                .call_ledger(
                    self.ledger
                        .create_transaction(&transaction.to_new_transaction()),
                )
                .await
            {
                Ok(confirmed) => {
                    self.settle_confirmed(&operation.local_id, &transaction.id, &confirmed)
                        .await?;
                    Ok(confirmed)
                }
                Err(err) => {
                    warn!(
                        "Edit of optimistic transaction {} stays queued as {} [{}]: {}",
                        transaction.id,
                        operation.local_id,
                        err.retry_class().code(),
                        err
                    );
                    Ok(transaction)
                }
            };
        }

        let superseded: Vec<LocalOperationId> = earlier
            .iter()
            .filter(|op| op.action == PendingAction::Update)
            .map(|op| op.local_id)
            .collect();
        let operation = PendingOperation::update(transaction.clone());
        self.record_intent(&operation, &superseded).await?;

        match self
            .call_ledger(self.ledger.update_transaction(&transaction))
            .await
        {
            Ok(confirmed) => {
                self.settle_confirmed(&operation.local_id, &transaction.id, &confirmed)
                    .await?;
                Ok(confirmed)
            }
            Err(err) => {
                warn!(
                    "Update of transaction {} queued as {} [{}]: {}",
                    transaction.id,
                    operation.local_id,
                    err.retry_class().code(),
                    err
                );
                Ok(transaction)
            }
        }
    }

    async fn delete_transaction(&self, transaction_id: &TransactionId) -> Result<()> {
        // The account of a record is fixed; everything else is read under
        // its guard.
        let account_id = match self.cache.get(transaction_id).await? {
            Some(record) => Some(record.account_id),
            None => self
                .pending_for_transaction(transaction_id)
                .await?
                .iter()
                .find_map(|op| op.account_id),
        };
        let _guard = match account_id {
            Some(account_id) => Some(self.account_locks.lock(account_id).await),
            None => None,
        };

        let earlier = self.pending_for_transaction(transaction_id).await?;
        let superseded: Vec<LocalOperationId> = earlier.iter().map(|op| op.local_id).collect();

        let Some(remote_id) = transaction_id.confirmed() else {
            self.remove_pending(&superseded).await?;
            self.cache.remove(transaction_id).await?;
            self.pending_log.persist().await?;
            self.cache.persist().await?;
            debug!("Discarded optimistic transaction {}", transaction_id);
            return Ok(());
        };

        let snapshot = match self.cache.get(transaction_id).await? {
            Some(record) => Some(record),
            None => earlier.iter().rev().find_map(|op| op.transaction.clone()),
        };
        let operation = match snapshot {
            Some(snapshot) => PendingOperation::delete(snapshot),
            None => PendingOperation::delete_by_id(remote_id),
        };
        self.record_intent(&operation, &superseded).await?;

        match self
            .call_ledger(self.ledger.delete_transaction(remote_id))
            .await
        {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => {
                warn!(
                    "Delete of transaction {} queued as {} [{}]: {}",
                    transaction_id,
                    operation.local_id,
                    err.retry_class().code(),
                    err
                );
                return Ok(());
            }
        }
        self.pending_log.remove(&operation.local_id).await?;
        self.pending_log.persist().await
    }

    async fn replay_pending(&self, account_id: i64) -> Result<ReplayReport> {
        let _guard = self.account_locks.lock(account_id).await;
        let pass = self.replay_locked(account_id).await?;
        if !pass.confirmed.is_empty() {
            for record in pass.confirmed {
                self.cache.insert(record).await?;
            }
            self.cache.persist().await?;
        }
        Ok(pass.report)
    }

    async fn pending_operations(&self, account_id: i64) -> Result<Vec<PendingOperation>> {
        let _guard = self.account_locks.lock(account_id).await;
        self.pending_for_account(account_id).await
    }

    async fn discard_pending_operation(&self, local_id: &LocalOperationId) -> Result<bool> {
        let Some(target) = self
            .pending_log
            .all()
            .await?
            .into_iter()
            .find(|op| &op.local_id == local_id)
        else {
            return Ok(false);
        };

        let _guard = match target.account_id {
            Some(account_id) => Some(self.account_locks.lock(account_id).await),
            None => None,
        };
        self.pending_log.remove(local_id).await?;

        // An optimistic record without any remaining intent has nothing
        // behind it.
        let transaction_id = target.transaction_id;
        if transaction_id.is_local()
            && self
                .pending_for_transaction(&transaction_id)
                .await?
                .is_empty()
        {
            self.cache.remove(&transaction_id).await?;
            self.cache.persist().await?;
        }
        self.pending_log.persist().await?;

        info!(
            "Discarded pending {:?} {} for transaction {}",
            target.action, local_id, transaction_id
        );
        Ok(true)
    }
}
