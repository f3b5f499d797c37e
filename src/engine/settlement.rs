//! Settlement planning and application.
//!
//! A settlement runs in two pure phases. `plan_settlement` walks the payer's
//! outstanding per-transaction debts to the payee oldest-first and decides
//! how the payment is distributed: fully settled transactions, at most one
//! partial boundary, and any leftover credit. `apply_plan` then produces
//! updated relation, ledger, and group snapshots. Neither phase performs
//! I/O; the coordinator persists the outcome best-effort afterwards.

use crate::domain::{
    Amount, CurrencyCode, CurrencyKind, Relation, RelationHistoryEntry, TimeMs, TransactionLedger,
    UserId,
};
use crate::engine::rollup::distribute_proportionally;
use crate::engine::{GroupDelta, PlannedPortion, SettlementPlan};
use thiserror::Error;
use tracing::debug;

/// Validation failures rejected before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    /// Self-settlement signals a caller bug, not a recoverable user error.
    #[error("payer and payee must differ")]
    SelfSettlement,
    #[error("settlement amount must be positive, got {0}")]
    NonPositiveAmount(Amount),
    #[error("emoji currency {0} requires a whole-number amount, got {1}")]
    FractionalEmojiAmount(CurrencyCode, Amount),
}

/// Updated snapshots produced by applying a plan. Only touched ledgers are
/// included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementOutcome {
    pub payer_relation: Relation,
    pub payee_relation: Relation,
    pub ledgers: Vec<TransactionLedger>,
    pub group_deltas: Vec<GroupDelta>,
}

/// Decimal places used when splitting amounts in a currency.
fn scale_of(currency: &CurrencyCode) -> u32 {
    match currency.kind() {
        CurrencyKind::Legal => 2,
        CurrencyKind::Emoji => 0,
    }
}

/// Compute how a payment of `amount` from `payer` to `payee` distributes
/// across the payer's outstanding debts.
///
/// `relation` is the payer's side of the pair; `ledgers` must contain the
/// ledgers referenced by its open history entries. Entries are candidates
/// only when they carry a transaction id, are unsettled, match the
/// currency, and the payer is the debtor in that ledger — a payment can
/// only settle debts where the payer is the one who owes. Entries whose
/// ledger is absent (transaction deleted) are skipped.
pub fn plan_settlement(
    payer: &UserId,
    payee: &UserId,
    amount: Amount,
    currency: &CurrencyCode,
    relation: &Relation,
    ledgers: &[TransactionLedger],
) -> Result<SettlementPlan, SettlementError> {
    if payer == payee {
        return Err(SettlementError::SelfSettlement);
    }
    if !amount.is_positive() {
        return Err(SettlementError::NonPositiveAmount(amount));
    }
    if currency.kind() == CurrencyKind::Emoji && !amount.is_integer() {
        return Err(SettlementError::FractionalEmojiAmount(
            currency.clone(),
            amount,
        ));
    }

    let mut candidates: Vec<(&TransactionLedger, Amount, TimeMs)> = Vec::new();
    for entry in relation.open_transaction_entries(currency) {
        let transaction_id = entry
            .transaction_id
            .as_ref()
            .expect("open_transaction_entries yields linked entries only");
        let Some(ledger) = ledgers.iter().find(|l| &l.id == transaction_id) else {
            debug!("skipping settlement candidate {}: ledger absent", transaction_id);
            continue;
        };
        let outstanding = ledger.outstanding_debt_of(payer, payee);
        if outstanding.is_zero() {
            // Payer is not the debtor in this transaction.
            continue;
        }
        candidates.push((ledger, outstanding, entry.date));
    }

    // Oldest first; sort_by_key is stable so insertion order breaks ties.
    candidates.sort_by_key(|(_, _, date)| *date);

    let mut full = Vec::new();
    let mut partial = None;
    let mut money_left = amount;

    for (ledger, outstanding, _) in candidates {
        if money_left.is_zero() {
            break;
        }
        let portion = PlannedPortion {
            transaction_id: ledger.id.clone(),
            transaction_title: ledger.title.clone(),
            group: ledger.group.clone(),
            portion: if money_left >= outstanding {
                outstanding
            } else {
                money_left
            },
        };
        if money_left >= outstanding {
            money_left = money_left - outstanding;
            full.push(portion);
        } else {
            partial = Some(portion);
            money_left = Amount::zero();
        }
    }

    Ok(SettlementPlan {
        payer: payer.clone(),
        payee: payee.clone(),
        currency: currency.clone(),
        amount,
        full,
        partial,
        leftover: money_left,
    })
}

/// Apply a plan to the fetched snapshots, producing updated ones.
///
/// `settlement_id` keys the history records of this settlement; `now` dates
/// them. Conservation holds for every returned ledger and the two relations
/// stay mirror images of each other.
pub fn apply_plan(
    plan: &SettlementPlan,
    settlement_id: &str,
    mut payer_relation: Relation,
    mut payee_relation: Relation,
    ledgers: Vec<TransactionLedger>,
    now: TimeMs,
) -> SettlementOutcome {
    let mut touched = Vec::new();
    let mut group_deltas = Vec::new();

    for portion in plan.portions() {
        let Some(ledger) = ledgers.iter().find(|l| l.id == portion.transaction_id) else {
            continue;
        };
        let updated = settle_ledger_portion(ledger.clone(), plan, portion.portion);
        touched.push(updated);

        if let Some(group) = &portion.group {
            group_deltas.push(GroupDelta {
                group: group.clone(),
                user: plan.payer.clone(),
                currency: plan.currency.clone(),
                delta: portion.portion,
            });
            group_deltas.push(GroupDelta {
                group: group.clone(),
                user: plan.payee.clone(),
                currency: plan.currency.clone(),
                delta: -portion.portion,
            });
        }
    }

    for portion in &plan.full {
        payer_relation = payer_relation
            .mark_transaction_settled(&portion.transaction_id)
            .with_history(RelationHistoryEntry::settlement_record(
                settlement_id,
                portion.transaction_title.clone(),
                portion.portion,
                plan.currency.clone(),
                true,
                now,
            ));
        payee_relation = payee_relation
            .mark_transaction_settled(&portion.transaction_id)
            .with_history(RelationHistoryEntry::settlement_record(
                settlement_id,
                portion.transaction_title.clone(),
                -portion.portion,
                plan.currency.clone(),
                true,
                now,
            ));
    }

    if let Some(portion) = &plan.partial {
        // The underlying transaction still carries open balance, so the
        // records stay unsettled and the debt entry keeps its flag.
        payer_relation = payer_relation.with_history(RelationHistoryEntry::settlement_record(
            settlement_id,
            portion.transaction_title.clone(),
            portion.portion,
            plan.currency.clone(),
            false,
            now,
        ));
        payee_relation = payee_relation.with_history(RelationHistoryEntry::settlement_record(
            settlement_id,
            portion.transaction_title.clone(),
            -portion.portion,
            plan.currency.clone(),
            false,
            now,
        ));
    }

    if plan.leftover.is_positive() {
        // Paid beyond recorded debt: the payee now owes the payer.
        payer_relation = payer_relation.with_history(RelationHistoryEntry::settlement_record(
            settlement_id,
            "Payment",
            plan.leftover,
            plan.currency.clone(),
            false,
            now,
        ));
        payee_relation = payee_relation.with_history(RelationHistoryEntry::settlement_record(
            settlement_id,
            "Payment",
            -plan.leftover,
            plan.currency.clone(),
            false,
            now,
        ));

        group_deltas.extend(leftover_group_deltas(plan));
    }

    SettlementOutcome {
        payer_relation,
        payee_relation,
        ledgers: touched,
        group_deltas,
    }
}

/// Apply one portion to a ledger: reduce the pairwise debt, adjust both
/// participants, and flag whatever reaches exactly zero as settled.
fn settle_ledger_portion(
    ledger: TransactionLedger,
    plan: &SettlementPlan,
    portion: Amount,
) -> TransactionLedger {
    let mut updated = ledger;

    if let Some(debt) = updated.debt_between(&plan.payer, &plan.payee).cloned() {
        let amount = if debt.from == plan.payer {
            debt.amount - portion
        } else {
            debt.amount + portion
        };
        updated = updated.replace_debt(crate::domain::DebtEntry {
            settled: amount.is_zero(),
            amount,
            ..debt
        });
    }

    if let Some(user) = updated.user(&plan.payer).cloned() {
        let current_balance = user.current_balance + portion;
        updated = updated.replace_user(crate::domain::TransactionUser {
            settled: current_balance.is_zero(),
            current_balance,
            ..user
        });
    }

    if let Some(user) = updated.user(&plan.payee).cloned() {
        let current_balance = user.current_balance - portion;
        updated = updated.replace_user(crate::domain::TransactionUser {
            settled: current_balance.is_zero(),
            current_balance,
            ..user
        });
    }

    debug_assert!(updated.is_balanced(), "settlement broke conservation");
    updated
}

/// Distribute the leftover credit across the groups of the settled
/// transactions, proportionally to each transaction's contribution to the
/// total debt resolved.
fn leftover_group_deltas(plan: &SettlementPlan) -> Vec<GroupDelta> {
    let grouped: Vec<&PlannedPortion> = plan.portions().filter(|p| p.group.is_some()).collect();
    if grouped.is_empty() {
        return Vec::new();
    }

    let total = plan.total_resolved();
    if total.is_zero() {
        return Vec::new();
    }

    let scale = scale_of(&plan.currency);
    let grouped_total = Amount::sum(grouped.iter().map(|p| p.portion));
    let grouped_leftover = if grouped_total == total {
        plan.leftover
    } else {
        (plan.leftover * grouped_total / total).round_dp(scale)
    };

    let weights: Vec<Amount> = grouped.iter().map(|p| p.portion).collect();
    let shares = distribute_proportionally(grouped_leftover, &weights, scale);

    grouped
        .iter()
        .zip(shares)
        .flat_map(|(portion, share)| {
            let group = portion.group.clone().expect("filtered on group presence");
            [
                GroupDelta {
                    group: group.clone(),
                    user: plan.payer.clone(),
                    currency: plan.currency.clone(),
                    delta: share,
                },
                GroupDelta {
                    group,
                    user: plan.payee.clone(),
                    currency: plan.currency.clone(),
                    delta: -share,
                },
            ]
        })
        .collect()
}
