//! Per-transaction ledger: participants, per-user balances, pairwise debts.

use crate::domain::{Amount, CurrencyCode, GroupId, TimeMs, TransactionId, UserId};
use serde::{Deserialize, Serialize};

/// Per-transaction record of the amount owed between two users.
///
/// Positive `amount` means `from` owes `to`; negative means the reverse.
/// Distinct from the cross-transaction relation balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtEntry {
    pub from: UserId,
    pub to: UserId,
    /// Remaining signed amount owed.
    pub amount: Amount,
    /// Amount at transaction creation; never changes afterwards.
    pub initial_amount: Amount,
    pub settled: bool,
}

impl DebtEntry {
    /// Create a fresh debt entry; `initial_amount` mirrors `amount`.
    pub fn new(from: UserId, to: UserId, amount: Amount) -> Self {
        DebtEntry {
            from,
            to,
            amount,
            initial_amount: amount,
            settled: false,
        }
    }

    /// True when this entry is between the two given users, in either
    /// direction.
    pub fn involves(&self, a: &UserId, b: &UserId) -> bool {
        (&self.from == a && &self.to == b) || (&self.from == b && &self.to == a)
    }

    /// The absolute amount `debtor` still owes through this entry, zero if
    /// they are not the debtor.
    pub fn owed_by(&self, debtor: &UserId) -> Amount {
        if &self.from == debtor && self.amount.is_positive() {
            self.amount
        } else if &self.to == debtor && self.amount.is_negative() {
            self.amount.abs()
        } else {
            Amount::zero()
        }
    }
}

/// Per-transaction per-user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionUser {
    pub user: UserId,
    /// Balance at transaction creation; never changes afterwards.
    pub initial_balance: Amount,
    /// Remaining balance: negative = still owes, positive = still owed.
    pub current_balance: Amount,
    pub settled: bool,
}

impl TransactionUser {
    /// Create a fresh participant record; `current_balance` mirrors
    /// `initial_balance`.
    pub fn new(user: UserId, initial_balance: Amount) -> Self {
        TransactionUser {
            user,
            initial_balance,
            current_balance: initial_balance,
            settled: false,
        }
    }
}

/// One multi-party transaction: who fronted, who owes, per-user balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLedger {
    pub id: TransactionId,
    pub title: String,
    /// Group this transaction belongs to, if any.
    pub group: Option<GroupId>,
    pub currency: CurrencyCode,
    pub date: TimeMs,
    pub users: Vec<TransactionUser>,
    /// One entry per ordered pair of involved users with a nonzero
    /// relationship.
    pub debts: Vec<DebtEntry>,
}

impl TransactionLedger {
    /// The debt entry between two users, in either direction. Callers must
    /// inspect `from`/`to` to determine who owes whom.
    pub fn debt_between(&self, a: &UserId, b: &UserId) -> Option<&DebtEntry> {
        self.debts.iter().find(|d| d.involves(a, b))
    }

    /// The participant record for a user.
    pub fn user(&self, user: &UserId) -> Option<&TransactionUser> {
        self.users.iter().find(|u| &u.user == user)
    }

    /// Replace the participant record for `user.user`, remove-then-add.
    pub fn replace_user(mut self, user: TransactionUser) -> TransactionLedger {
        self.users.retain(|u| u.user != user.user);
        self.users.push(user);
        self
    }

    /// Replace the debt entry between `debt.from` and `debt.to`,
    /// remove-then-add.
    pub fn replace_debt(mut self, debt: DebtEntry) -> TransactionLedger {
        self.debts.retain(|d| !d.involves(&debt.from, &debt.to));
        self.debts.push(debt);
        self
    }

    /// Conservation check: participant balances must sum to zero before the
    /// ledger is considered consistent for persistence.
    pub fn is_balanced(&self) -> bool {
        Amount::sum(self.users.iter().map(|u| u.current_balance)).is_zero()
    }

    /// The absolute amount `payer` still owes `payee` in this transaction.
    pub fn outstanding_debt_of(&self, payer: &UserId, payee: &UserId) -> Amount {
        self.debt_between(payer, payee)
            .map(|d| d.owed_by(payer))
            .unwrap_or_else(Amount::zero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn a(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    fn dinner() -> TransactionLedger {
        // Bob fronted 30; Alice and Carol owe 10 each.
        TransactionLedger {
            id: TransactionId::new("t1"),
            title: "Dinner".to_string(),
            group: None,
            currency: CurrencyCode::new("USD"),
            date: TimeMs::new(100),
            users: vec![
                TransactionUser::new(UserId::new("alice"), a("-10")),
                TransactionUser::new(UserId::new("bob"), a("20")),
                TransactionUser::new(UserId::new("carol"), a("-10")),
            ],
            debts: vec![
                DebtEntry::new(UserId::new("alice"), UserId::new("bob"), a("10")),
                DebtEntry::new(UserId::new("carol"), UserId::new("bob"), a("10")),
            ],
        }
    }

    #[test]
    fn test_debt_between_either_direction() {
        let ledger = dinner();
        let forward = ledger.debt_between(&UserId::new("alice"), &UserId::new("bob"));
        let reverse = ledger.debt_between(&UserId::new("bob"), &UserId::new("alice"));
        assert_eq!(forward, reverse);
        assert!(forward.is_some());
        assert!(ledger
            .debt_between(&UserId::new("alice"), &UserId::new("carol"))
            .is_none());
    }

    #[test]
    fn test_owed_by_respects_sign_and_direction() {
        let debt = DebtEntry::new(UserId::new("alice"), UserId::new("bob"), a("10"));
        assert_eq!(debt.owed_by(&UserId::new("alice")), a("10"));
        assert_eq!(debt.owed_by(&UserId::new("bob")), Amount::zero());

        let reversed = DebtEntry::new(UserId::new("alice"), UserId::new("bob"), a("-4"));
        assert_eq!(reversed.owed_by(&UserId::new("bob")), a("4"));
        assert_eq!(reversed.owed_by(&UserId::new("alice")), Amount::zero());
    }

    #[test]
    fn test_replace_user_discards_existing() {
        let ledger = dinner();
        let updated = ledger.replace_user(TransactionUser {
            user: UserId::new("alice"),
            initial_balance: a("-10"),
            current_balance: Amount::zero(),
            settled: true,
        });

        assert_eq!(updated.users.len(), 3);
        let alice = updated.user(&UserId::new("alice")).unwrap();
        assert!(alice.settled);
        assert_eq!(alice.current_balance, Amount::zero());
    }

    #[test]
    fn test_replace_debt_discards_existing() {
        let ledger = dinner();
        let updated = ledger.replace_debt(DebtEntry {
            from: UserId::new("alice"),
            to: UserId::new("bob"),
            amount: a("4"),
            initial_amount: a("10"),
            settled: false,
        });

        assert_eq!(updated.debts.len(), 2);
        let debt = updated
            .debt_between(&UserId::new("alice"), &UserId::new("bob"))
            .unwrap();
        assert_eq!(debt.amount, a("4"));
        assert_eq!(debt.initial_amount, a("10"));
    }

    #[test]
    fn test_is_balanced() {
        let ledger = dinner();
        assert!(ledger.is_balanced());

        let broken = ledger.replace_user(TransactionUser::new(UserId::new("alice"), a("-5")));
        assert!(!broken.is_balanced());
    }

    #[test]
    fn test_outstanding_debt_of() {
        let ledger = dinner();
        assert_eq!(
            ledger.outstanding_debt_of(&UserId::new("alice"), &UserId::new("bob")),
            a("10")
        );
        // Bob owes Alice nothing; he is the creditor.
        assert_eq!(
            ledger.outstanding_debt_of(&UserId::new("bob"), &UserId::new("alice")),
            Amount::zero()
        );
        assert_eq!(
            ledger.outstanding_debt_of(&UserId::new("alice"), &UserId::new("carol")),
            Amount::zero()
        );
    }

    #[test]
    fn test_ledger_json_roundtrip() {
        let ledger = dinner();
        let json = serde_json::to_string(&ledger).unwrap();
        let back: TransactionLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ledger);
    }
}
