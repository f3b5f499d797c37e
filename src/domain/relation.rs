//! Pairwise relation state: running balances and history between two users.
//!
//! A `Relation` is one side of a pair: the owner's view of the counterparty.
//! Positive balance means the counterparty owes the owner. Every mutation is
//! a pure function returning an updated snapshot; the persistence layer
//! writes both sides of a pair back as a unit.

use crate::domain::{Amount, CurrencyCode, TimeMs, TransactionId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One event contributing to the running balance of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationHistoryEntry {
    /// Stable unique key for this entry.
    pub entry_key: String,
    /// Signed balance change from the owner's perspective.
    pub amount_change: Amount,
    /// Currency the change applies to.
    pub currency: CurrencyCode,
    /// Originating transaction, if any. None means a manual settlement
    /// credit or a deleted transaction.
    pub transaction_id: Option<TransactionId>,
    /// Display title, kept independent of the transaction's lifecycle.
    pub transaction_title: String,
    /// Whether this entry is considered fully resolved.
    pub settled: bool,
    /// When the entry was recorded.
    pub date: TimeMs,
}

impl RelationHistoryEntry {
    /// Create an entry originating from a transaction debt.
    ///
    /// The key is derived from the transaction id; by convention a relation
    /// holds at most one debt entry per transaction.
    pub fn from_transaction(
        transaction_id: TransactionId,
        transaction_title: impl Into<String>,
        amount_change: Amount,
        currency: CurrencyCode,
        date: TimeMs,
    ) -> Self {
        let entry_key = format!("tx:{}", transaction_id.as_str());
        RelationHistoryEntry {
            entry_key,
            amount_change,
            currency,
            transaction_id: Some(transaction_id),
            transaction_title: transaction_title.into(),
            settled: false,
            date,
        }
    }

    /// Create a settlement record (no originating transaction).
    ///
    /// Used for the settled portion of a payment and for leftover credits.
    /// The key hashes the settlement id with the entry fields so the two
    /// sides of a pair get distinct, stable keys.
    pub fn settlement_record(
        settlement_id: &str,
        transaction_title: impl Into<String>,
        amount_change: Amount,
        currency: CurrencyCode,
        settled: bool,
        date: TimeMs,
    ) -> Self {
        let entry_key = Self::compute_entry_key(settlement_id, &amount_change, &currency, date);
        RelationHistoryEntry {
            entry_key,
            amount_change,
            currency,
            transaction_id: None,
            transaction_title: transaction_title.into(),
            settled,
            date,
        }
    }

    /// Generate a stable unique key from deterministic fields.
    fn compute_entry_key(
        settlement_id: &str,
        amount_change: &Amount,
        currency: &CurrencyCode,
        date: TimeMs,
    ) -> String {
        use sha2::{Digest, Sha256};

        // Length-prefix each field so concatenations cannot collide.
        fn hash_var(hasher: &mut Sha256, data: &str) {
            hasher.update(data.len().to_le_bytes());
            hasher.update(data.as_bytes());
        }

        let mut hasher = Sha256::new();
        hash_var(&mut hasher, settlement_id);
        hash_var(&mut hasher, &amount_change.to_canonical_string());
        hash_var(&mut hasher, currency.as_str());
        hash_var(&mut hasher, &date.as_i64().to_string());
        let hash = hasher.finalize();
        format!("hash:{}", hex::encode(&hash[..16]))
    }
}

/// Aggregate balance and history between two users, from the owner's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// The user whose view this is.
    pub owner: UserId,
    /// The other party.
    pub counterparty: UserId,
    /// Per-currency running balance. Positive = counterparty owes owner.
    pub balances: BTreeMap<CurrencyCode, Amount>,
    /// Insertion-ordered history; sorting by date is a display concern.
    pub history: Vec<RelationHistoryEntry>,
    /// Timestamp of the most recent history addition.
    pub last_interacted: TimeMs,
}

impl Relation {
    /// Create an empty relation between two users.
    pub fn new(owner: UserId, counterparty: UserId) -> Self {
        Relation {
            owner,
            counterparty,
            balances: BTreeMap::new(),
            history: Vec::new(),
            last_interacted: TimeMs::new(0),
        }
    }

    /// Document id for this side of the pair.
    pub fn doc_id(&self) -> String {
        relation_doc_id(&self.owner, &self.counterparty)
    }

    /// Balance for a currency, zero if the currency was never touched.
    pub fn balance(&self, currency: &CurrencyCode) -> Amount {
        self.balances
            .get(currency)
            .copied()
            .unwrap_or_else(Amount::zero)
    }

    /// Append a history entry, bumping the matching balance and
    /// `last_interacted`. Pure; consumes and returns the snapshot.
    pub fn with_history(mut self, entry: RelationHistoryEntry) -> Relation {
        let balance = self.balance(&entry.currency) + entry.amount_change;
        self.balances.insert(entry.currency.clone(), balance);
        self.last_interacted = entry.date;
        self.history.push(entry);
        self
    }

    /// Remove the (at most one, by convention) entry originating from the
    /// given transaction, subtracting its balance effect. Returns the
    /// relation unchanged when no entry matches; that is not an error.
    pub fn without_transaction(mut self, transaction_id: &TransactionId) -> Relation {
        let position = self
            .history
            .iter()
            .position(|e| e.transaction_id.as_ref() == Some(transaction_id));

        let Some(position) = position else {
            return self;
        };

        let entry = self.history.remove(position);
        let balance = self.balance(&entry.currency) - entry.amount_change;
        self.balances.insert(entry.currency, balance);
        self
    }

    /// Flag the debt entry for a transaction as settled. The balance is
    /// untouched; the settlement's own records carry the balance change.
    pub fn mark_transaction_settled(mut self, transaction_id: &TransactionId) -> Relation {
        for entry in &mut self.history {
            if entry.transaction_id.as_ref() == Some(transaction_id) {
                entry.settled = true;
            }
        }
        self
    }

    /// History entries that are candidates for per-transaction settlement:
    /// linked to a transaction, not settled, in the given currency.
    pub fn open_transaction_entries(&self, currency: &CurrencyCode) -> Vec<&RelationHistoryEntry> {
        self.history
            .iter()
            .filter(|e| e.transaction_id.is_some() && !e.settled && &e.currency == currency)
            .collect()
    }

    /// True when `other` is the opposite side of this pair with negated
    /// balances on every currency.
    pub fn is_mirror_of(&self, other: &Relation) -> bool {
        if self.owner != other.counterparty || self.counterparty != other.owner {
            return false;
        }
        let currencies: std::collections::BTreeSet<&CurrencyCode> =
            self.balances.keys().chain(other.balances.keys()).collect();
        currencies
            .into_iter()
            .all(|c| self.balance(c) == -other.balance(c))
    }
}

/// Document id for the relation owned by `owner` toward `counterparty`.
pub fn relation_doc_id(owner: &UserId, counterparty: &UserId) -> String {
    format!("{}:{}", owner.as_str(), counterparty.as_str())
}

/// Relations split by who owes whom in one currency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionedRelations {
    /// Counterparty owes the owner.
    pub positive: Vec<Relation>,
    /// Owner owes the counterparty.
    pub negative: Vec<Relation>,
}

/// Partition relations by the sign of their balance in `currency`.
///
/// Zero balances are dropped from both lists. Input order is preserved;
/// callers apply their own secondary sort for display.
pub fn partition_by_balance(
    relations: Vec<Relation>,
    currency: &CurrencyCode,
) -> PartitionedRelations {
    let mut partitioned = PartitionedRelations::default();
    for relation in relations {
        let balance = relation.balance(currency);
        if balance.is_positive() {
            partitioned.positive.push(relation);
        } else if balance.is_negative() {
            partitioned.negative.push(relation);
        }
    }
    partitioned
}
