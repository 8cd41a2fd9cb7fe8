//! Collapses a pending-log snapshot into the calls replay actually has to make.

use std::collections::{HashMap, HashSet};

use super::pending_operation_model::{LocalOperationId, PendingAction, PendingOperation};
use crate::transactions::TransactionId;

/// An operation to send to the ledger, plus the log entries it stands in for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOperation {
    pub operation: PendingOperation,
    /// Entries folded into `operation`. They resolve together with it and
    /// stay queued if it fails.
    pub folded: Vec<LocalOperationId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayPlan {
    /// In log order.
    pub replay: Vec<PlannedOperation>,
    /// Entries made redundant by a later one; safe to drop without a call.
    pub superseded: Vec<LocalOperationId>,
}

/// Plan a replay pass over `operations` (log order).
///
/// Rules, per transaction id:
/// - a local id never reached the ledger: its first create/update becomes a
///   create carrying the latest snapshot, later entries fold into it; if the
///   id was deleted, every entry is superseded and nothing is sent.
/// - a confirmed id with a delete: only the last delete is sent.
/// - a confirmed id without a delete: only the last update is sent.
pub fn plan_replay(operations: Vec<PendingOperation>) -> ReplayPlan {
    let mut last_delete: HashMap<TransactionId, usize> = HashMap::new();
    let mut last_update: HashMap<TransactionId, usize> = HashMap::new();
    let mut latest_snapshot: HashMap<TransactionId, usize> = HashMap::new();

    for (idx, op) in operations.iter().enumerate() {
        let id = op.transaction_id;
        match op.action {
            PendingAction::Delete => {
                last_delete.insert(id, idx);
            }
            PendingAction::Update => {
                last_update.insert(id, idx);
                latest_snapshot.insert(id, idx);
            }
            PendingAction::Create => {
                latest_snapshot.insert(id, idx);
            }
        }
    }

    let mut plan = ReplayPlan::default();
    // Position in `plan.replay` of the create standing in for a local id.
    let mut local_creates: HashMap<TransactionId, usize> = HashMap::new();
    let mut seen: HashSet<LocalOperationId> = HashSet::new();

    for (idx, op) in operations.iter().enumerate() {
        if !seen.insert(op.local_id) {
            continue;
        }
        let id = op.transaction_id;

        if let Some(&delete_idx) = last_delete.get(&id) {
            if id.is_local() || idx != delete_idx {
                plan.superseded.push(op.local_id);
            } else {
                plan.replay.push(PlannedOperation {
                    operation: op.clone(),
                    folded: Vec::new(),
                });
            }
            continue;
        }

        if id.is_local() {
            match local_creates.get(&id) {
                Some(&pos) => {
                    let planned = &mut plan.replay[pos];
                    planned.folded.push(op.local_id);
                    for matched in &op.prior_matches {
                        if !planned.operation.prior_matches.contains(matched) {
                            planned.operation.prior_matches.push(*matched);
                        }
                    }
                }
                None => {
                    let mut operation = op.clone();
                    operation.action = PendingAction::Create;
                    if let Some(&latest) = latest_snapshot.get(&id) {
                        operation.transaction = operations[latest].transaction.clone();
                    }
                    local_creates.insert(id, plan.replay.len());
                    plan.replay.push(PlannedOperation {
                        operation,
                        folded: Vec::new(),
                    });
                }
            }
            continue;
        }

        match op.action {
            PendingAction::Update if last_update.get(&id) != Some(&idx) => {
                plan.superseded.push(op.local_id);
            }
            _ => plan.replay.push(PlannedOperation {
                operation: op.clone(),
                folded: Vec::new(),
            }),
        }
    }

    plan
}
