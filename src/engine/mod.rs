//! Pure computation engine for settlement and group roll-up.
//!
//! Everything here runs synchronously over in-memory snapshots; the current
//! time is an argument and all I/O lives with the coordinator.

use crate::domain::{Amount, CurrencyCode, GroupId, TransactionId, UserId};

pub mod rollup;
pub mod settlement;

pub use rollup::{apply_delta, apply_transaction_delta, distribute_proportionally};
pub use settlement::{apply_plan, plan_settlement, SettlementError, SettlementOutcome};

/// One transaction's share of a settlement, in resolution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPortion {
    pub transaction_id: TransactionId,
    pub transaction_title: String,
    pub group: Option<GroupId>,
    /// Absolute amount this transaction absorbs.
    pub portion: Amount,
}

/// The distribution of a payment across outstanding debts, computed before
/// any state is touched. Once computed, the plan executes to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementPlan {
    pub payer: UserId,
    pub payee: UserId,
    pub currency: CurrencyCode,
    /// The requested payment amount.
    pub amount: Amount,
    /// Transactions resolved entirely, oldest first.
    pub full: Vec<PlannedPortion>,
    /// The partial-settlement boundary, if the walk stopped mid-entry.
    pub partial: Option<PlannedPortion>,
    /// Payment remaining after all outstanding debt, recorded as a credit
    /// in the opposite direction.
    pub leftover: Amount,
}

impl SettlementPlan {
    /// Total debt resolved by this plan (excludes the leftover credit).
    pub fn total_resolved(&self) -> Amount {
        let full = Amount::sum(self.full.iter().map(|p| p.portion));
        match &self.partial {
            Some(partial) => full + partial.portion,
            None => full,
        }
    }

    /// All portions, full first, then the boundary.
    pub fn portions(&self) -> impl Iterator<Item = &PlannedPortion> {
        self.full.iter().chain(self.partial.iter())
    }
}

/// A single balance adjustment to a group's roll-up, emitted by
/// `apply_plan` and folded into group documents by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDelta {
    pub group: GroupId,
    pub user: UserId,
    pub currency: CurrencyCode,
    pub delta: Amount,
}
