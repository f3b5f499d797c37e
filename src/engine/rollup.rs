//! Group balance roll-up.
//!
//! Groups never expose their balance map for direct mutation; every change
//! flows through these functions as a delta against a fetched snapshot.

use crate::domain::{Amount, CurrencyCode, Group, UserId};
use crate::engine::GroupDelta;

/// Add `delta` to a user's balance in one currency, creating the nested
/// map entries if absent. Pure; consumes and returns the snapshot.
pub fn apply_transaction_delta(
    mut group: Group,
    user: &UserId,
    currency: &CurrencyCode,
    delta: Amount,
) -> Group {
    let by_currency = group.balances.entry(user.clone()).or_default();
    let balance = by_currency
        .get(currency)
        .copied()
        .unwrap_or_else(Amount::zero);
    by_currency.insert(currency.clone(), balance + delta);
    group
}

/// Fold a settlement delta into the group it targets.
///
/// Deltas for other groups are the caller's responsibility; applying one
/// here would corrupt the roll-up, so mismatches are ignored.
pub fn apply_delta(group: Group, delta: &GroupDelta) -> Group {
    if group.id != delta.group {
        return group;
    }
    apply_transaction_delta(group, &delta.user, &delta.currency, delta.delta)
}

/// Split `total` across `weights` proportionally, rounded to `scale`
/// decimal places, with the final share taking the exact remainder so the
/// shares always sum to `total`.
///
/// Zero or empty weights yield all-zero shares with the remainder on the
/// last one.
pub fn distribute_proportionally(total: Amount, weights: &[Amount], scale: u32) -> Vec<Amount> {
    if weights.is_empty() {
        return Vec::new();
    }

    let weight_sum = Amount::sum(weights.iter().copied());
    let mut shares = Vec::with_capacity(weights.len());
    let mut assigned = Amount::zero();

    for (i, weight) in weights.iter().enumerate() {
        let share = if i == weights.len() - 1 {
            total - assigned
        } else if weight_sum.is_zero() {
            Amount::zero()
        } else {
            (total * *weight / weight_sum).round_dp(scale)
        };
        assigned = assigned + share;
        shares.push(share);
    }

    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurrencyCode, GroupId};
    use std::str::FromStr;

    fn a(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    fn usd() -> CurrencyCode {
        CurrencyCode::new("USD")
    }

    #[test]
    fn test_apply_transaction_delta_creates_nested_entries() {
        let group = Group::new(GroupId::new("g1"), "Trip");
        let group = apply_transaction_delta(group, &UserId::new("alice"), &usd(), a("10"));
        let group = apply_transaction_delta(group, &UserId::new("alice"), &usd(), a("-4"));

        assert_eq!(group.balance(&UserId::new("alice"), &usd()), a("6"));
        assert_eq!(group.balance(&UserId::new("bob"), &usd()), Amount::zero());
    }

    #[test]
    fn test_apply_delta_ignores_other_groups() {
        let group = Group::new(GroupId::new("g1"), "Trip");
        let delta = GroupDelta {
            group: GroupId::new("g2"),
            user: UserId::new("alice"),
            currency: usd(),
            delta: a("10"),
        };
        let group = apply_delta(group, &delta);
        assert_eq!(group.balance(&UserId::new("alice"), &usd()), Amount::zero());
    }

    #[test]
    fn test_distribute_proportionally_sums_exactly() {
        let shares = distribute_proportionally(a("10"), &[a("60"), a("40")], 2);
        assert_eq!(shares, vec![a("6"), a("4")]);

        // A split that does not divide evenly: remainder lands on the last.
        let shares = distribute_proportionally(a("10"), &[a("1"), a("1"), a("1")], 2);
        assert_eq!(Amount::sum(shares.iter().copied()), a("10"));
        assert_eq!(shares[0], a("3.33"));
        assert_eq!(shares[1], a("3.33"));
        assert_eq!(shares[2], a("3.34"));
    }

    #[test]
    fn test_distribute_proportionally_whole_counts() {
        let shares = distribute_proportionally(a("5"), &[a("2"), a("1")], 0);
        assert_eq!(Amount::sum(shares.iter().copied()), a("5"));
        assert!(shares.iter().all(|s| s.is_integer()));
    }

    #[test]
    fn test_distribute_proportionally_zero_weights() {
        let shares = distribute_proportionally(a("9"), &[Amount::zero(), Amount::zero()], 2);
        assert_eq!(shares, vec![Amount::zero(), a("9")]);
    }

    #[test]
    fn test_distribute_proportionally_empty() {
        assert!(distribute_proportionally(a("9"), &[], 2).is_empty());
    }
}
