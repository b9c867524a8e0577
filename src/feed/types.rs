//! Feed wire types and decoded updates

use crate::gateway::OrderSide;
use serde::Deserialize;
use serde_json::json;

/// A decoded best-price update for one market
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketUpdate {
    /// Full best bid/ask for both sides, in cents (0 = unknown)
    Snapshot {
        yes_bid: u32,
        yes_ask: u32,
        no_bid: u32,
        no_ask: u32,
    },
    /// One side's best price changed
    Delta {
        side: OrderSide,
        price: u32,
        delta: i64,
    },
}

/// Inbound wire message envelope
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "msg", rename_all = "snake_case")]
pub enum WireMessage {
    OrderbookSnapshot(SnapshotMsg),
    OrderbookDelta(DeltaMsg),
    Subscribed(serde_json::Value),
    Error(serde_json::Value),
}

/// Order book snapshot: per side, an ordered `[price_cents, quantity]` list
/// with the best level first.
#[derive(Debug, Deserialize)]
pub struct SnapshotMsg {
    pub market_ticker: String,
    #[serde(default)]
    pub yes: Vec<[i64; 2]>,
    #[serde(default)]
    pub no: Vec<[i64; 2]>,
}

/// Order book delta: one side's best price/quantity change
#[derive(Debug, Deserialize)]
pub struct DeltaMsg {
    pub market_ticker: String,
    pub side: OrderSide,
    pub price: u32,
    pub delta: i64,
}

impl SnapshotMsg {
    /// Decode best bid both sides plus the implied asks
    /// (`yes_ask = 100 - no_bid`, `no_ask = 100 - yes_bid`).
    pub fn to_update(&self) -> MarketUpdate {
        let yes_bid = best_price(&self.yes);
        let no_bid = best_price(&self.no);
        let yes_ask = if no_bid > 0 { 100 - no_bid } else { 0 };
        let no_ask = if yes_bid > 0 { 100 - yes_bid } else { 0 };

        MarketUpdate::Snapshot {
            yes_bid,
            yes_ask,
            no_bid,
            no_ask,
        }
    }
}

fn best_price(levels: &[[i64; 2]]) -> u32 {
    levels
        .first()
        .and_then(|level| u32::try_from(level[0]).ok())
        .filter(|p| *p <= 100)
        .unwrap_or(0)
}

/// Build the subscribe/unsubscribe command for the order book channel
pub fn command(id: u64, cmd: &str, tickers: &[String]) -> String {
    json!({
        "id": id,
        "cmd": cmd,
        "params": {
            "channels": ["orderbook_delta"],
            "market_tickers": tickers,
        }
    })
    .to_string()
}
