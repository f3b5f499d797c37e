//! Coordination between the pure engine and the document store.

pub mod clock;
pub mod settle;

pub use clock::{Clock, FixedClock, SystemClock};
pub use settle::{
    CoordinatorError, FailedWrite, SettleRequest, SettlementCoordinator, SettlementReceipt,
};
