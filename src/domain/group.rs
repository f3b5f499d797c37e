//! Group-level balance state, updated only through the roll-up functions.

use crate::domain::{Amount, CurrencyCode, GroupId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A group's net positions: user -> currency -> amount, summed across all
/// transactions tagged with the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub balances: BTreeMap<UserId, BTreeMap<CurrencyCode, Amount>>,
}

impl Group {
    /// Create an empty group.
    pub fn new(id: GroupId, name: impl Into<String>) -> Self {
        Group {
            id,
            name: name.into(),
            balances: BTreeMap::new(),
        }
    }

    /// A user's balance in one currency, zero if absent.
    pub fn balance(&self, user: &UserId, currency: &CurrencyCode) -> Amount {
        self.balances
            .get(user)
            .and_then(|by_currency| by_currency.get(currency))
            .copied()
            .unwrap_or_else(Amount::zero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_balance_defaults_to_zero() {
        let group = Group::new(GroupId::new("g1"), "Ski trip");
        assert_eq!(
            group.balance(&UserId::new("alice"), &CurrencyCode::new("USD")),
            Amount::zero()
        );
    }

    #[test]
    fn test_group_json_roundtrip() {
        let mut group = Group::new(GroupId::new("g1"), "Ski trip");
        group
            .balances
            .entry(UserId::new("alice"))
            .or_default()
            .insert(CurrencyCode::new("USD"), Amount::from_str("-12.5").unwrap());

        let json = serde_json::to_string(&group).unwrap();
        let back: Group = serde_json::from_str(&json).unwrap();
        assert_eq!(back, group);
    }
}
