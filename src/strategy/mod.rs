//! Momentum convergence strategy
//!
//! YES and NO midpoints should sum to roughly 100 cents. When a gap exists
//! and starts shrinking, one side is being bid up; the strategy enters on
//! that side and manages the position with a stop loss and a trailing stop.

mod momentum;
mod types;

pub use momentum::MomentumStrategy;
pub use types::{ExitReason, MomentumSignal, Signal};
