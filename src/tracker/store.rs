//! JSON-backed trade journal

use super::types::{MarketSummary, TrackerSummary, Trade};
use crate::gateway::{OrderAction, OrderSide};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// Only this many of the most recent trades are persisted
const MAX_PERSISTED_TRADES: usize = 1000;

#[derive(Debug, Default, Serialize, Deserialize)]
struct TrackerState {
    #[serde(default)]
    realized_pnl: Decimal,
    #[serde(default)]
    starting_balance: Decimal,
    #[serde(default)]
    market_pnl: HashMap<String, Decimal>,
    #[serde(default)]
    market_trades: HashMap<String, u64>,
    #[serde(default)]
    winning_trades: u64,
    #[serde(default)]
    losing_trades: u64,
    #[serde(default)]
    trades: Vec<Trade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_updated: Option<DateTime<Utc>>,
}

/// Tracks all executed trades with JSON persistence
pub struct TradeTracker {
    path: PathBuf,
    state: Mutex<TrackerState>,
    session_start: DateTime<Utc>,
}

impl TradeTracker {
    /// Open a tracker backed by the given file, restoring any prior history.
    /// A missing or unreadable file starts a fresh journal.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = Self::load(&path).unwrap_or_default();
        if !state.trades.is_empty() {
            tracing::info!(
                trades = state.trades.len(),
                realized_pnl = %state.realized_pnl,
                path = %path.display(),
                "Restored trade history"
            );
        }
        Self {
            path,
            state: Mutex::new(state),
            session_start: Utc::now(),
        }
    }

    fn load(path: &Path) -> Option<TrackerState> {
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(state) => Some(state),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Unreadable trade journal, starting fresh");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read trade journal, starting fresh");
                None
            }
        }
    }

    fn save(path: &Path, state: &mut TrackerState) {
        if state.trades.len() > MAX_PERSISTED_TRADES {
            let excess = state.trades.len() - MAX_PERSISTED_TRADES;
            state.trades.drain(..excess);
        }
        state.last_updated = Some(Utc::now());

        let result = serde_json::to_string_pretty(state)
            .map_err(anyhow::Error::from)
            .and_then(|json| std::fs::write(path, json).map_err(anyhow::Error::from));
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "Failed to persist trade journal");
        }
    }

    /// Record the session's starting balance, first writer wins
    pub fn set_starting_balance(&self, balance: Decimal) {
        let mut state = self.state.lock().unwrap();
        if state.starting_balance.is_zero() {
            state.starting_balance = balance;
            Self::save(&self.path, &mut state);
        }
    }

    /// Record an executed fill and persist the journal
    #[allow(clippy::too_many_arguments)]
    pub fn record_trade(
        &self,
        ticker: &str,
        side: OrderSide,
        action: OrderAction,
        price: u32,
        quantity: u32,
        order_id: &str,
        pnl: Decimal,
        reason: Option<&str>,
    ) -> Trade {
        let trade = Trade {
            trade_id: Uuid::new_v4().to_string(),
            ticker: ticker.to_string(),
            side,
            action,
            price,
            quantity,
            timestamp: Utc::now(),
            order_id: order_id.to_string(),
            pnl,
            reason: reason.map(str::to_string),
        };

        let mut state = self.state.lock().unwrap();
        if !pnl.is_zero() {
            state.realized_pnl += pnl;
            *state.market_pnl.entry(ticker.to_string()).or_default() += pnl;
            if pnl > Decimal::ZERO {
                state.winning_trades += 1;
            } else {
                state.losing_trades += 1;
            }
        }
        *state.market_trades.entry(ticker.to_string()).or_default() += 1;
        state.trades.push(trade.clone());
        Self::save(&self.path, &mut state);
        trade
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.state.lock().unwrap().realized_pnl
    }

    pub fn get_summary(&self) -> TrackerSummary {
        let state = self.state.lock().unwrap();
        let closed = state.winning_trades + state.losing_trades;
        let win_rate = if closed > 0 {
            state.winning_trades as f64 / closed as f64
        } else {
            0.0
        };
        TrackerSummary {
            total_trades: state.trades.len(),
            realized_pnl: state.realized_pnl,
            starting_balance: state.starting_balance,
            winning_trades: state.winning_trades,
            losing_trades: state.losing_trades,
            win_rate,
            markets_traded: state.market_trades.len(),
            session_minutes: (Utc::now() - self.session_start).num_seconds() as f64 / 60.0,
        }
    }

    pub fn get_market_summary(&self, ticker: &str) -> MarketSummary {
        let state = self.state.lock().unwrap();
        MarketSummary {
            ticker: ticker.to_string(),
            pnl: state.market_pnl.get(ticker).copied().unwrap_or_default(),
            trades: state.market_trades.get(ticker).copied().unwrap_or_default(),
        }
    }

    /// Wipe all history, in memory and on disk
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        *state = TrackerState::default();
        Self::save(&self.path, &mut state);
        tracing::info!("Trade journal reset");
    }
}
