pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod store;

pub use config::Config;
pub use domain::{
    Amount, CurrencyCode, CurrencyKind, Group, GroupId, Relation, RelationHistoryEntry, TimeMs,
    TransactionId, TransactionLedger, UserId,
};
pub use error::AppError;
pub use orchestration::{
    Clock, FixedClock, SettleRequest, SettlementCoordinator, SettlementReceipt, SystemClock,
};
pub use store::{init_store, DocumentStore, MemoryStore, RemoteStore, SqliteStore};
