//! Trade history and realized P&L tracking
//!
//! Every fill is journaled to a JSON file so a restart resumes with the
//! session's aggregates intact. Persistence failures are logged and never
//! interrupt trading.

mod store;
mod types;

pub use store::TradeTracker;
pub use types::{MarketSummary, TrackerSummary, Trade};
