//! Trade record and summary types

use crate::gateway::{OrderAction, OrderSide};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One executed fill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: String,
    pub ticker: String,
    pub side: OrderSide,
    pub action: OrderAction,
    /// Fill price in cents
    pub price: u32,
    pub quantity: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub order_id: String,
    /// Realized P&L in dollars when this fill closed a position
    #[serde(default)]
    pub pnl: Decimal,
    /// Exit reason for closing fills
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Session-level trading summary
#[derive(Debug, Clone)]
pub struct TrackerSummary {
    pub total_trades: usize,
    pub realized_pnl: Decimal,
    pub starting_balance: Decimal,
    pub winning_trades: u64,
    pub losing_trades: u64,
    /// Winning share of closed trades, 0 when none have closed
    pub win_rate: f64,
    pub markets_traded: usize,
    pub session_minutes: f64,
}

/// Per-market trading summary
#[derive(Debug, Clone)]
pub struct MarketSummary {
    pub ticker: String,
    pub pnl: Decimal,
    pub trades: u64,
}
