//! Open position tracking

use crate::gateway::OrderSide;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An open position in one market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub ticker: String,
    pub side: OrderSide,
    pub quantity: u32,
    /// Entry price in cents
    pub entry_price: u32,
    pub stop_loss_price: u32,
    pub trailing_stop_price: u32,
    /// High-water mark for the trailing stop ratchet
    pub highest_price: u32,
    pub entry_time: DateTime<Utc>,
    pub order_id: String,
}

impl Position {
    /// Unrealized P&L in dollars at the given price
    pub fn unrealized_pnl(&self, current_price: u32) -> Decimal {
        let move_cents = i64::from(current_price) - i64::from(self.entry_price);
        Decimal::from(move_cents * i64::from(self.quantity)) / Decimal::from(100)
    }

    /// Ratchet the trailing stop up on a new high; never moves it down
    pub fn update_trailing_stop(&mut self, current_price: u32, trail_cents: u32) {
        if current_price > self.highest_price {
            self.highest_price = current_price;
            self.trailing_stop_price = current_price.saturating_sub(trail_cents).max(1);
        }
    }
}
