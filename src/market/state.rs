//! Market state with bounded price history

use crate::feed::MarketUpdate;
use crate::gateway::OrderSide;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// How much price history a market retains
const MAX_HISTORY_SECONDS: i64 = 30;

/// A single price observation, both sides of the book
#[derive(Debug, Clone, Copy)]
pub struct PriceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub yes_bid: u32,
    pub yes_ask: u32,
    pub no_bid: u32,
    pub no_ask: u32,
}

impl PriceSnapshot {
    /// YES midpoint in cents; 0 when either side of the quote is absent
    pub fn yes_mid(&self) -> Decimal {
        mid(self.yes_bid, self.yes_ask)
    }

    /// NO midpoint in cents; 0 when either side of the quote is absent
    pub fn no_mid(&self) -> Decimal {
        mid(self.no_bid, self.no_ask)
    }

    /// `100 - yes_mid - no_mid`; 0 when either mid is unknown
    pub fn gap(&self) -> Decimal {
        gap(self.yes_mid(), self.no_mid())
    }
}

fn mid(bid: u32, ask: u32) -> Decimal {
    if bid > 0 && ask > 0 {
        Decimal::from(bid + ask) / Decimal::from(2)
    } else {
        Decimal::ZERO
    }
}

fn gap(yes_mid: Decimal, no_mid: Decimal) -> Decimal {
    if !yes_mid.is_zero() && !no_mid.is_zero() {
        Decimal::from(100) - yes_mid - no_mid
    } else {
        Decimal::ZERO
    }
}

/// Current state of one market with a 30-second snapshot history
#[derive(Debug, Clone)]
pub struct MarketState {
    pub ticker: String,
    pub yes_bid: u32,
    pub yes_ask: u32,
    pub no_bid: u32,
    pub no_ask: u32,
    pub volume: u64,
    pub last_update: DateTime<Utc>,
    history: VecDeque<PriceSnapshot>,
}

impl MarketState {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            yes_bid: 0,
            yes_ask: 0,
            no_bid: 0,
            no_ask: 0,
            volume: 0,
            last_update: Utc::now(),
            history: VecDeque::new(),
        }
    }

    /// Apply a feed update and record a snapshot
    pub fn apply(&mut self, update: &MarketUpdate) {
        self.apply_at(update, Utc::now());
    }

    /// Apply a feed update with an explicit clock (for tests)
    pub fn apply_at(&mut self, update: &MarketUpdate, now: DateTime<Utc>) {
        match update {
            MarketUpdate::Snapshot {
                yes_bid,
                yes_ask,
                no_bid,
                no_ask,
            } => {
                self.yes_bid = *yes_bid;
                self.yes_ask = *yes_ask;
                self.no_bid = *no_bid;
                self.no_ask = *no_ask;
            }
            MarketUpdate::Delta { side, price, .. } => match side {
                OrderSide::Yes => self.yes_bid = *price,
                OrderSide::No => self.no_bid = *price,
            },
        }
        self.last_update = now;
        self.record_snapshot(now);
    }

    fn record_snapshot(&mut self, now: DateTime<Utc>) {
        self.history.push_back(PriceSnapshot {
            timestamp: now,
            yes_bid: self.yes_bid,
            yes_ask: self.yes_ask,
            no_bid: self.no_bid,
            no_ask: self.no_ask,
        });

        let cutoff = now - Duration::seconds(MAX_HISTORY_SECONDS);
        while let Some(front) = self.history.front() {
            if front.timestamp <= cutoff {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }

    /// YES midpoint; 0 when either side of the quote is absent
    pub fn yes_mid(&self) -> Decimal {
        mid(self.yes_bid, self.yes_ask)
    }

    /// NO midpoint; 0 when either side of the quote is absent
    pub fn no_mid(&self) -> Decimal {
        mid(self.no_bid, self.no_ask)
    }

    /// YES bid-ask spread in cents; 0 without a two-sided quote
    pub fn spread(&self) -> u32 {
        if self.yes_bid > 0 && self.yes_ask > 0 {
            self.yes_ask.saturating_sub(self.yes_bid)
        } else {
            0
        }
    }

    /// `100 - yes_mid - no_mid`; 0 when either mid is unknown
    pub fn gap(&self) -> Decimal {
        gap(self.yes_mid(), self.no_mid())
    }

    /// Current price for a held side, falling back to the bid when the
    /// midpoint is unknown. 0 means no usable price.
    pub fn price_for_side(&self, side: OrderSide) -> u32 {
        let (mid, bid) = match side {
            OrderSide::Yes => (self.yes_mid(), self.yes_bid),
            OrderSide::No => (self.no_mid(), self.no_bid),
        };
        if mid.is_zero() {
            bid
        } else {
            mid.trunc().to_u32().unwrap_or(bid)
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// True when no update has arrived within `max_age`
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.last_update > max_age
    }

    /// The reference snapshot for a trailing window: the newest snapshot at or
    /// before `now - window`, or the oldest available when none is old enough.
    fn window_reference(&self, window: Duration, now: DateTime<Utc>) -> Option<&PriceSnapshot> {
        if self.history.len() < 2 {
            return None;
        }
        let cutoff = now - window;
        self.history
            .iter()
            .rev()
            .find(|s| s.timestamp <= cutoff)
            .or_else(|| self.history.front())
    }

    /// Gap change over the window; negative means the gap is shrinking.
    ///
    /// `None` with insufficient history or when the reference gap is unknown.
    pub fn gap_change(&self, window: Duration, now: DateTime<Utc>) -> Option<Decimal> {
        let old = self.window_reference(window, now)?;
        let old_gap = old.gap();
        if old_gap.is_zero() {
            return None;
        }
        Some(self.gap() - old_gap)
    }

    /// YES midpoint change over the window, in cents
    pub fn yes_price_change(&self, window: Duration, now: DateTime<Utc>) -> Option<Decimal> {
        let old = self.window_reference(window, now)?;
        Some(self.yes_mid() - old.yes_mid())
    }
}
