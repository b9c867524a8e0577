//! Per-market trader
//!
//! One async task per traded market. The task owns that market's state and
//! position, drains its feed channel each tick, and runs the strategy at a
//! fixed cadence. Shared services (gateway, risk ledger, tracker) are the
//! only cross-task touch points.

mod market;
mod types;

pub use market::MarketTrader;
pub use types::{PositionStatus, TraderStats, TraderStatus};
