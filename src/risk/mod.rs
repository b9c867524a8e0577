//! Risk management
//!
//! A single ledger guards every order: per-market position caps, a total
//! exposure cap, per-market cooldowns, and a daily-loss circuit breaker.
//! All checks and mutations happen under one lock so concurrent traders
//! cannot race past a limit.

mod ledger;
mod position;

pub use ledger::{RiskDenial, RiskLedger, RiskSummary};
pub use position::Position;
