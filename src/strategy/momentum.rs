//! Momentum convergence detection and position management rules
//!
//! Pure decision logic over a market's price history. The per-market trader
//! owns state and timing; everything here is a function of its inputs.

use super::types::{ExitReason, MomentumSignal, Signal};
use crate::config::{MomentumConfig, RiskConfig};
use crate::gateway::OrderSide;
use crate::market::MarketState;
use crate::risk::Position;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Snapshots required before the strategy will read anything into a window
const MIN_HISTORY_LEN: usize = 3;

/// Minimum signal confidence for reversing an open position
const REVERSAL_CONFIDENCE: Decimal = dec!(0.5);

/// Momentum convergence strategy
pub struct MomentumStrategy {
    momentum: MomentumConfig,
    risk: RiskConfig,
}

impl MomentumStrategy {
    pub fn new(momentum: MomentumConfig, risk: RiskConfig) -> Self {
        Self { momentum, risk }
    }

    /// Analyze a market's recent history for a momentum signal
    pub fn analyze(&self, state: &MarketState) -> Option<MomentumSignal> {
        self.analyze_at(state, Utc::now())
    }

    /// Analyze with an explicit clock (for tests)
    ///
    /// Convergence entry: the gap shrank past the convergence threshold and
    /// the YES move cleared the entry threshold. Confidence scales with the
    /// YES move, capped at 1. Without convergence, a pure price move of 1.5x
    /// the entry threshold still signals, with confidence capped at 0.8.
    pub fn analyze_at(&self, state: &MarketState, now: DateTime<Utc>) -> Option<MomentumSignal> {
        if state.history_len() < MIN_HISTORY_LEN {
            return None;
        }

        let window = Duration::seconds(self.momentum.window_seconds as i64);
        let gap_change = state.gap_change(window, now)?;
        let yes_change = state.yes_price_change(window, now)?;

        let threshold = Decimal::from(self.momentum.entry_threshold_cents);
        let converging = gap_change < -self.momentum.convergence_threshold;

        let (signal, confidence) = if converging && yes_change.abs() >= threshold {
            let direction = if yes_change > Decimal::ZERO {
                Signal::Bullish
            } else {
                Signal::Bearish
            };
            (direction, (yes_change.abs() / dec!(5)).min(Decimal::ONE))
        } else if yes_change.abs() >= threshold * dec!(1.5) {
            let direction = if yes_change > Decimal::ZERO {
                Signal::Bullish
            } else {
                Signal::Bearish
            };
            (direction, (yes_change.abs() / dec!(6)).min(dec!(0.8)))
        } else {
            return None;
        };

        Some(MomentumSignal {
            ticker: state.ticker.clone(),
            signal,
            gap_change,
            yes_price_change: yes_change,
            current_yes_price: trunc_cents(state.yes_mid()),
            current_no_price: trunc_cents(state.no_mid()),
            confidence,
            detected_at: now,
        })
    }

    /// Side and limit price for entering on a signal
    ///
    /// Bids one cent through the midpoint of the signalled side. `None` when
    /// that side has no usable price.
    pub fn entry_plan(&self, signal: &MomentumSignal) -> Option<(OrderSide, u32)> {
        let (side, base) = match signal.signal {
            Signal::Bullish => (OrderSide::Yes, signal.current_yes_price),
            Signal::Bearish => (OrderSide::No, signal.current_no_price),
        };
        if base == 0 {
            return None;
        }
        Some((side, (base + 1).min(99)))
    }

    /// Stop loss: entry minus the stop distance plus the exchange fee,
    /// floored at 1 cent.
    pub fn stop_loss_price(&self, entry_price: u32) -> u32 {
        entry_price
            .saturating_sub(self.risk.stop_loss_cents + self.risk.fee_cents)
            .max(1)
    }

    /// Initial trailing stop below entry, floored at 1 cent
    pub fn initial_trailing_stop(&self, entry_price: u32) -> u32 {
        entry_price.saturating_sub(self.risk.trailing_stop_cents).max(1)
    }

    /// Check an open position against its stops. Stop loss wins when both
    /// would trigger. A zero price means no usable quote; never exit on it.
    pub fn should_exit(&self, position: &Position, current_price: u32) -> Option<ExitReason> {
        if current_price == 0 {
            return None;
        }
        if current_price <= position.stop_loss_price {
            return Some(ExitReason::StopLoss);
        }
        if position.trailing_stop_price > 0 && current_price <= position.trailing_stop_price {
            return Some(ExitReason::TrailingStop);
        }
        None
    }

    /// Check whether a confident opposite signal should flip the position
    pub fn should_reverse(
        &self,
        signal: &MomentumSignal,
        position: &Position,
    ) -> Option<ExitReason> {
        if signal.confidence < REVERSAL_CONFIDENCE {
            return None;
        }
        match (position.side, signal.signal) {
            (OrderSide::Yes, Signal::Bearish) => Some(ExitReason::BearishReversal),
            (OrderSide::No, Signal::Bullish) => Some(ExitReason::BullishReversal),
            _ => None,
        }
    }
}

fn trunc_cents(mid: Decimal) -> u32 {
    mid.trunc().to_u32().unwrap_or(0)
}
