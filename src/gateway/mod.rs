//! Order gateway module
//!
//! Order submission and account queries (paper and live modes), plus market
//! discovery against the exchange REST API.

mod kalshi;
mod paper;
mod types;

pub use kalshi::KalshiGateway;
pub use paper::PaperGateway;
pub use types::{
    ExchangePosition, GatewayError, MarketInfo, OpenOrder, OrderAction, OrderId, OrderSide,
};

use async_trait::async_trait;
use rust_decimal::Decimal;

/// Trait for order gateway implementations
///
/// Safe for concurrent use by multiple traders; every method is a single
/// round trip with no cross-call state.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Place a limit order; price in whole cents 1-99, count > 0.
    ///
    /// Returns the exchange-assigned order id. Acceptance is treated as a
    /// fill by callers; there is no fill-reconciliation loop.
    async fn place_order(
        &self,
        ticker: &str,
        side: OrderSide,
        action: OrderAction,
        price: u32,
        count: u32,
    ) -> Result<OrderId, GatewayError>;

    /// Cancel an order; treated as idempotent by callers.
    async fn cancel_order(&self, order_id: &str) -> Result<(), GatewayError>;

    /// Account balance in dollars
    async fn get_balance(&self) -> Result<Decimal, GatewayError>;

    /// Positions as reported by the exchange
    async fn get_positions(&self) -> Result<Vec<ExchangePosition>, GatewayError>;

    /// Resting orders
    async fn get_open_orders(&self) -> Result<Vec<OpenOrder>, GatewayError>;
}

/// Trait for market discovery implementations
#[async_trait]
pub trait MarketDiscovery: Send + Sync {
    /// Fetch all open markets, following pagination
    async fn discover_markets(&self) -> Result<Vec<MarketInfo>, GatewayError>;
}
