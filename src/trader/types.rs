//! Trader status types

use crate::gateway::OrderSide;
use rust_decimal::Decimal;

/// Lifetime counters for one trader
#[derive(Debug, Clone, Copy, Default)]
pub struct TraderStats {
    pub signals_detected: u64,
    pub entries: u64,
    pub exits: u64,
    pub stop_losses: u64,
    pub trailing_stops: u64,
    pub reversals: u64,
}

/// Open position summary for status reporting
#[derive(Debug, Clone)]
pub struct PositionStatus {
    pub side: OrderSide,
    pub quantity: u32,
    pub entry_price: u32,
    pub current_price: u32,
    pub stop_loss_price: u32,
    pub trailing_stop_price: u32,
    pub unrealized_pnl: Decimal,
}

/// Point-in-time view of one trader, published every tick
#[derive(Debug, Clone, Default)]
pub struct TraderStatus {
    pub ticker: String,
    pub yes_bid: u32,
    pub yes_ask: u32,
    pub no_bid: u32,
    pub gap: Decimal,
    pub position: Option<PositionStatus>,
    pub stats: TraderStats,
}
