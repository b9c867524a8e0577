//! Strategy signal types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of detected momentum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    /// YES is being bid up; buy YES
    Bullish,
    /// NO is being bid up; buy NO
    Bearish,
}

/// A detected momentum signal for one market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentumSignal {
    pub ticker: String,
    pub signal: Signal,
    /// Gap change over the momentum window; negative means converging
    pub gap_change: Decimal,
    /// YES midpoint change over the momentum window, in cents
    pub yes_price_change: Decimal,
    /// Truncated YES midpoint when detected (0 = unknown)
    pub current_yes_price: u32,
    /// Truncated NO midpoint when detected (0 = unknown)
    pub current_no_price: u32,
    /// 0 to 1, scaled from the magnitude of the YES move
    pub confidence: Decimal,
    pub detected_at: DateTime<Utc>,
}

impl MomentumSignal {
    pub fn is_bullish(&self) -> bool {
        self.signal == Signal::Bullish
    }

    pub fn is_bearish(&self) -> bool {
        self.signal == Signal::Bearish
    }
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    TrailingStop,
    BearishReversal,
    BullishReversal,
    Shutdown,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TrailingStop => "trailing_stop",
            ExitReason::BearishReversal => "bearish_reversal",
            ExitReason::BullishReversal => "bullish_reversal",
            ExitReason::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
