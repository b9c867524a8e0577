//! Order gateway types

use serde::{Deserialize, Serialize};

/// Exchange-assigned order identifier
pub type OrderId = String;

/// Contract side of a binary market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Yes,
    No,
}

impl OrderSide {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderSide::Yes => "yes",
            OrderSide::No => "no",
        }
    }

    /// The complementary side
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Yes => OrderSide::No,
            OrderSide::No => OrderSide::Yes,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
    Buy,
    Sell,
}

impl OrderAction {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderAction::Buy => "buy",
            OrderAction::Sell => "sell",
        }
    }
}

impl std::fmt::Display for OrderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gateway errors
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Invalid order: {0}")]
    InvalidOrder(String),
}

/// Summary of a discoverable market, as returned by the markets endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct MarketInfo {
    pub ticker: String,
    #[serde(default)]
    pub yes_bid: u32,
    #[serde(default)]
    pub yes_ask: u32,
    #[serde(default)]
    pub no_bid: u32,
    #[serde(default)]
    pub volume: u64,
    #[serde(default)]
    pub open_interest: u64,
}

impl MarketInfo {
    /// YES spread in cents; `None` without a usable two-sided quote
    pub fn spread(&self) -> Option<u32> {
        if self.yes_bid > 0 && self.yes_ask > 0 && self.yes_ask < 100 && self.yes_ask > self.yes_bid
        {
            Some(self.yes_ask - self.yes_bid)
        } else {
            None
        }
    }
}

/// A position as reported by the exchange
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangePosition {
    pub ticker: String,
    /// Signed contract count: positive = yes, negative = no
    #[serde(default)]
    pub position: i64,
}

/// A resting order as reported by the exchange
#[derive(Debug, Clone, Deserialize)]
pub struct OpenOrder {
    pub order_id: OrderId,
    pub ticker: String,
    pub side: OrderSide,
    pub action: OrderAction,
    #[serde(default)]
    pub remaining_count: u32,
}
