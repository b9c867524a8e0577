//! Market selection and liquidity tracking
//!
//! Pure functions over discovery results. The strict filter wants real
//! volume and a tight two-sided quote; when it leaves too few candidates
//! the relaxed filter admits anything with a quote or any volume at all.

use crate::config::LiquidityConfig;
use crate::gateway::MarketInfo;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

/// Below this many strict matches, fall back to the relaxed filter
const RELAXED_FALLBACK_MIN: usize = 3;

/// Sort key for markets without a usable quote
const NO_QUOTE_SPREAD: u32 = 999;

/// Liquidity observed for a market at the last scan
#[derive(Debug, Clone, Copy)]
pub struct LiquiditySnapshot {
    pub volume: u64,
    pub spread: u32,
}

impl LiquiditySnapshot {
    pub fn of(market: &MarketInfo) -> Self {
        Self {
            volume: market.volume,
            spread: market.spread().unwrap_or(NO_QUOTE_SPREAD),
        }
    }
}

/// Changes between two scans
#[derive(Debug, Default)]
pub struct ScanDiff {
    /// Selected markets not currently traded
    pub new_markets: Vec<MarketInfo>,
    /// Tracked markets whose liquidity improved noticeably
    pub improved: Vec<String>,
    /// Traded markets that fell out of the selection
    pub lost: Vec<String>,
}

/// Filter, rank, and cap the tradable market set.
///
/// Ranking is spread ascending, volume descending; the tightest books with
/// the most activity come first.
pub fn select_markets(
    markets: &[MarketInfo],
    liquidity: &LiquidityConfig,
    max_markets: usize,
) -> Vec<MarketInfo> {
    let mut selected: Vec<MarketInfo> = markets
        .iter()
        .filter(|m| passes_strict(m, liquidity))
        .cloned()
        .collect();

    if selected.len() < RELAXED_FALLBACK_MIN {
        selected = markets.iter().filter(|m| passes_relaxed(m)).cloned().collect();
    }

    selected.sort_by_key(|m| (m.spread().unwrap_or(NO_QUOTE_SPREAD), Reverse(m.volume)));
    selected.truncate(max_markets);
    selected
}

fn passes_strict(market: &MarketInfo, liquidity: &LiquidityConfig) -> bool {
    if liquidity.min_volume > 0 && market.volume < liquidity.min_volume {
        return false;
    }
    matches!(market.spread(), Some(spread) if spread <= liquidity.max_spread_cents)
}

fn passes_relaxed(market: &MarketInfo) -> bool {
    market.spread().is_some() || market.volume > 0
}

/// Diff a fresh selection against the traded set and the last scan's
/// liquidity snapshots.
///
/// Improvement means volume up at least 20% or spread at least 20% tighter.
pub fn diff_markets(
    selected: &[MarketInfo],
    traded: &HashSet<String>,
    previous: &HashMap<String, LiquiditySnapshot>,
) -> ScanDiff {
    let selected_tickers: HashSet<&str> = selected.iter().map(|m| m.ticker.as_str()).collect();

    let new_markets = selected
        .iter()
        .filter(|m| !traded.contains(&m.ticker))
        .cloned()
        .collect();

    let improved = selected
        .iter()
        .filter(|m| {
            let Some(old) = previous.get(&m.ticker) else {
                return false;
            };
            let snapshot = LiquiditySnapshot::of(m);
            let volume_up = snapshot.volume * 10 > old.volume * 12;
            let spread_tighter = snapshot.spread * 10 < old.spread * 8;
            volume_up || spread_tighter
        })
        .map(|m| m.ticker.clone())
        .collect();

    let lost = traded
        .iter()
        .filter(|t| !selected_tickers.contains(t.as_str()))
        .cloned()
        .collect();

    ScanDiff {
        new_markets,
        improved,
        lost,
    }
}
