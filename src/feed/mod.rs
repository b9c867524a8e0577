//! Market data feed module
//!
//! One persistent WebSocket connection fanning best-price updates out to
//! per-ticker channels. Per-ticker delivery order matches receipt order;
//! there is no cross-ticker ordering guarantee.

mod kalshi;
mod types;

pub use kalshi::PriceFeed;
pub use types::{MarketUpdate, WireMessage};
