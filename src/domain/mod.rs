//! Domain types for the splitledger settlement core.
//!
//! This module provides:
//! - Lossless numeric handling via the Amount wrapper
//! - Domain primitives: TimeMs, UserId, TransactionId, GroupId, CurrencyCode
//! - Relation and history types with plain-JSON serialization
//! - Per-transaction ledger and group balance types

pub mod amount;
pub mod group;
pub mod primitives;
pub mod relation;
pub mod transaction;

pub use amount::Amount;
pub use group::Group;
pub use primitives::{CurrencyCode, CurrencyKind, GroupId, TimeMs, TransactionId, UserId};
pub use relation::{
    partition_by_balance, relation_doc_id, PartitionedRelations, Relation, RelationHistoryEntry,
};
pub use transaction::{DebtEntry, TransactionLedger, TransactionUser};
