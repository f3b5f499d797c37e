//! Settlement coordination: fetch snapshots, run the pure engine, persist.
//!
//! The backing store has no cross-document transactions, so the write-back
//! is an explicit best-effort multi-write: every touched document is
//! attempted, failures are collected into the receipt, and nothing is
//! rolled back. A settlement retried against stale snapshots is caught by
//! the version CAS and surfaces as a conflict.

use crate::domain::{
    relation_doc_id, Amount, CurrencyCode, Group, Relation, TransactionId, TransactionLedger,
    UserId,
};
use crate::engine::{apply_plan, plan_settlement, rollup, SettlementError};
use crate::orchestration::Clock;
use crate::store::{collections, fetch_typed, put_typed, DocumentStore, StoreError};
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// A payment intent collected by the UI.
#[derive(Debug, Clone)]
pub struct SettleRequest {
    pub payer: UserId,
    pub payee: UserId,
    pub amount: Amount,
    pub currency: CurrencyCode,
}

/// One document write that did not land.
#[derive(Debug, Clone)]
pub struct FailedWrite {
    pub collection: String,
    pub id: String,
    pub error: String,
    /// True when the failure was a version conflict; the caller should
    /// refetch and retry the whole settle.
    pub conflict: bool,
}

/// Outcome of a settlement, including partial-persistence detail.
#[derive(Debug, Clone)]
pub struct SettlementReceipt {
    pub settlement_id: String,
    /// True only when every write landed.
    pub success: bool,
    pub fully_settled_transaction_ids: Vec<TransactionId>,
    pub partial_transaction_id: Option<TransactionId>,
    pub leftover_credit: Amount,
    pub failed_writes: Vec<FailedWrite>,
}

/// Errors raised before any state is touched. Persistence failures are not
/// errors; they are expected partial outcomes captured in the receipt.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    InvalidRequest(#[from] SettlementError),
    #[error("no relation recorded between {payer} and {payee}")]
    UnknownRelation { payer: UserId, payee: UserId },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Entry point for applying payments. Holds no mutable state; every call
/// works on freshly fetched snapshots.
#[derive(Debug, Clone)]
pub struct SettlementCoordinator {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl SettlementCoordinator {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Apply a payment from payer to payee, distributing it across the
    /// payer's outstanding debts oldest-first.
    pub async fn settle(
        &self,
        request: SettleRequest,
    ) -> Result<SettlementReceipt, CoordinatorError> {
        let store = self.store.as_ref();
        let SettleRequest {
            payer,
            payee,
            amount,
            currency,
        } = request;

        let payer_id = relation_doc_id(&payer, &payee);
        let payee_id = relation_doc_id(&payee, &payer);
        let (payer_fetch, payee_fetch) = futures::try_join!(
            fetch_typed::<Relation>(store, collections::RELATIONS, &payer_id),
            fetch_typed::<Relation>(store, collections::RELATIONS, &payee_id),
        )?;

        let (Some((payer_relation, payer_version)), Some((payee_relation, payee_version))) =
            (payer_fetch, payee_fetch)
        else {
            return Err(CoordinatorError::UnknownRelation { payer, payee });
        };

        // Every open entry's ledger is fetched; entries whose ledger is
        // gone are skipped by the planner.
        let transaction_ids: Vec<TransactionId> = payer_relation
            .open_transaction_entries(&currency)
            .iter()
            .filter_map(|e| e.transaction_id.clone())
            .collect();

        let fetched = try_join_all(transaction_ids.iter().map(|id| {
            fetch_typed::<TransactionLedger>(store, collections::TRANSACTIONS, id.as_str())
        }))
        .await?;

        let mut ledger_versions: HashMap<TransactionId, i64> = HashMap::new();
        let mut ledgers: Vec<TransactionLedger> = Vec::new();
        for (id, doc) in transaction_ids.iter().zip(fetched) {
            match doc {
                Some((ledger, version)) => {
                    ledger_versions.insert(id.clone(), version);
                    ledgers.push(ledger);
                }
                None => warn!("transaction {} referenced by relation but absent", id),
            }
        }

        let plan = plan_settlement(&payer, &payee, amount, &currency, &payer_relation, &ledgers)?;
        let settlement_id = Uuid::new_v4().to_string();
        info!(
            "settlement {}: {} pays {} {} {} ({} full, partial: {}, leftover: {})",
            settlement_id,
            payer,
            payee,
            amount,
            currency,
            plan.full.len(),
            plan.partial.is_some(),
            plan.leftover,
        );

        let now = self.clock.now();
        let outcome = apply_plan(
            &plan,
            &settlement_id,
            payer_relation,
            payee_relation,
            ledgers,
            now,
        );

        // Fold the settlement's deltas into the affected group snapshots.
        let mut group_ids: Vec<_> = outcome.group_deltas.iter().map(|d| d.group.clone()).collect();
        group_ids.sort();
        group_ids.dedup();

        let group_docs = try_join_all(
            group_ids
                .iter()
                .map(|id| fetch_typed::<Group>(store, collections::GROUPS, id.as_str())),
        )
        .await?;

        let mut groups: Vec<(Group, i64)> = Vec::new();
        for (id, doc) in group_ids.iter().zip(group_docs) {
            match doc {
                Some((group, version)) => {
                    let group = outcome
                        .group_deltas
                        .iter()
                        .fold(group, |g, delta| rollup::apply_delta(g, delta));
                    groups.push((group, version));
                }
                None => warn!("group {} referenced by settlement but absent", id),
            }
        }

        // Best-effort multi-write: ledgers first (the authoritative
        // per-transaction record), then both relations, then groups.
        let mut failed_writes = Vec::new();

        for ledger in &outcome.ledgers {
            let expected = ledger_versions.get(&ledger.id).copied();
            let result = put_typed(
                store,
                collections::TRANSACTIONS,
                ledger.id.as_str(),
                ledger,
                expected,
            )
            .await;
            record_failure(&mut failed_writes, collections::TRANSACTIONS, ledger.id.as_str(), result);
        }

        let result = put_typed(
            store,
            collections::RELATIONS,
            &payer_id,
            &outcome.payer_relation,
            Some(payer_version),
        )
        .await;
        record_failure(&mut failed_writes, collections::RELATIONS, &payer_id, result);

        let result = put_typed(
            store,
            collections::RELATIONS,
            &payee_id,
            &outcome.payee_relation,
            Some(payee_version),
        )
        .await;
        record_failure(&mut failed_writes, collections::RELATIONS, &payee_id, result);

        for (group, version) in &groups {
            let result = put_typed(
                store,
                collections::GROUPS,
                group.id.as_str(),
                group,
                Some(*version),
            )
            .await;
            record_failure(&mut failed_writes, collections::GROUPS, group.id.as_str(), result);
        }

        if !failed_writes.is_empty() {
            warn!(
                "settlement {}: {} of {} writes failed",
                settlement_id,
                failed_writes.len(),
                outcome.ledgers.len() + groups.len() + 2,
            );
        }

        Ok(SettlementReceipt {
            settlement_id,
            success: failed_writes.is_empty(),
            fully_settled_transaction_ids: plan
                .full
                .iter()
                .map(|p| p.transaction_id.clone())
                .collect(),
            partial_transaction_id: plan.partial.as_ref().map(|p| p.transaction_id.clone()),
            leftover_credit: plan.leftover,
            failed_writes,
        })
    }
}

fn record_failure(
    failed_writes: &mut Vec<FailedWrite>,
    collection: &str,
    id: &str,
    result: Result<i64, StoreError>,
) {
    if let Err(error) = result {
        failed_writes.push(FailedWrite {
            collection: collection.to_string(),
            id: id.to_string(),
            conflict: error.is_conflict(),
            error: error.to_string(),
        });
    }
}
