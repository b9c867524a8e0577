//! Per-market price state
//!
//! `MarketState` is owned exclusively by its trader: the feed pushes updates
//! through a channel and only the owning worker ever mutates it.

mod state;

pub use state::{MarketState, PriceSnapshot};
