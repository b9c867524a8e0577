//! The risk ledger
//!
//! One mutex over all risk state. `check_can_trade` answers advisory
//! pre-checks; `record_entry` re-runs the same validation before admitting
//! the position, so two traders passing the pre-check simultaneously can
//! never both book past a cap.

use super::position::Position;
use crate::config::RiskConfig;
use crate::telemetry::{incr_counter, set_gauge, CounterMetric, GaugeMetric};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Why the ledger denied a trade
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RiskDenial {
    #[error("circuit breaker tripped")]
    CircuitBreaker,
    #[error("daily loss limit exceeded: {daily_pnl}")]
    DailyLossExceeded { daily_pnl: Decimal },
    #[error("cooldown: {remaining_secs}s remaining")]
    Cooldown { remaining_secs: u64 },
    #[error("market position cap: {held} + {requested} > {cap}")]
    MarketCap { held: u32, requested: u32, cap: u32 },
    #[error("total exposure cap: {current} + {additional} > {cap}")]
    ExposureCap {
        current: Decimal,
        additional: Decimal,
        cap: Decimal,
    },
}

/// Snapshot of ledger state for status reporting
#[derive(Debug, Clone)]
pub struct RiskSummary {
    pub open_positions: usize,
    pub total_exposure: Decimal,
    pub daily_pnl: Decimal,
    pub circuit_breaker: bool,
    pub max_daily_loss: Decimal,
    pub max_exposure: Decimal,
}

#[derive(Debug, Default)]
struct LedgerState {
    positions: HashMap<String, Position>,
    cooldowns: HashMap<String, DateTime<Utc>>,
    daily_realized_pnl: Decimal,
    circuit_breaker_tripped: bool,
}

impl LedgerState {
    fn total_exposure(&self) -> Decimal {
        self.positions
            .values()
            .map(|p| Decimal::from(u64::from(p.quantity) * u64::from(p.entry_price)))
            .sum::<Decimal>()
            / Decimal::from(100)
    }

    /// The full limit check. Fails closed; a denied daily-loss check trips
    /// the breaker so everything after it is refused outright.
    fn validate(
        &mut self,
        config: &RiskConfig,
        ticker: &str,
        size: u32,
        price: u32,
        now: DateTime<Utc>,
    ) -> Result<(), RiskDenial> {
        if self.circuit_breaker_tripped {
            return Err(RiskDenial::CircuitBreaker);
        }

        if self.daily_realized_pnl <= -config.max_daily_loss {
            self.circuit_breaker_tripped = true;
            tracing::error!(
                daily_pnl = %self.daily_realized_pnl,
                "Daily loss limit hit, circuit breaker tripped"
            );
            return Err(RiskDenial::DailyLossExceeded {
                daily_pnl: self.daily_realized_pnl,
            });
        }

        if let Some(last_trade) = self.cooldowns.get(ticker) {
            let cooldown = Duration::seconds(config.cooldown_seconds as i64);
            let elapsed = now - *last_trade;
            if elapsed < cooldown {
                let remaining_secs = (cooldown - elapsed).num_seconds().max(0) as u64;
                return Err(RiskDenial::Cooldown { remaining_secs });
            }
        }

        if let Some(position) = self.positions.get(ticker) {
            if position.quantity + size > config.max_position_per_market {
                return Err(RiskDenial::MarketCap {
                    held: position.quantity,
                    requested: size,
                    cap: config.max_position_per_market,
                });
            }
        }

        let current = self.total_exposure();
        let additional = Decimal::from(u64::from(size) * u64::from(price)) / Decimal::from(100);
        if current + additional > config.max_total_exposure {
            return Err(RiskDenial::ExposureCap {
                current,
                additional,
                cap: config.max_total_exposure,
            });
        }

        Ok(())
    }
}

/// Thread-safe risk ledger shared by all traders
pub struct RiskLedger {
    config: RiskConfig,
    state: Mutex<LedgerState>,
}

impl RiskLedger {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Advisory pre-check before placing an order
    pub fn check_can_trade(&self, ticker: &str, size: u32, price: u32) -> Result<(), RiskDenial> {
        self.check_can_trade_at(ticker, size, price, Utc::now())
    }

    pub fn check_can_trade_at(
        &self,
        ticker: &str,
        size: u32,
        price: u32,
        now: DateTime<Utc>,
    ) -> Result<(), RiskDenial> {
        let mut state = self.state.lock().unwrap();
        state
            .validate(&self.config, ticker, size, price, now)
            .inspect_err(|denial| {
                incr_counter(CounterMetric::RiskDenials);
                tracing::debug!(ticker, %denial, "Trade denied");
            })
    }

    /// Book a filled entry. Re-validates every limit under the same lock;
    /// the fill must be unwound by the caller if this denies.
    pub fn record_entry(&self, position: Position) -> Result<(), RiskDenial> {
        self.record_entry_at(position, Utc::now())
    }

    pub fn record_entry_at(
        &self,
        position: Position,
        now: DateTime<Utc>,
    ) -> Result<(), RiskDenial> {
        let mut state = self.state.lock().unwrap();
        state
            .validate(
                &self.config,
                &position.ticker,
                position.quantity,
                position.entry_price,
                now,
            )
            .inspect_err(|_| incr_counter(CounterMetric::RiskDenials))?;

        state.cooldowns.insert(position.ticker.clone(), now);
        state.positions.insert(position.ticker.clone(), position);
        Self::publish_gauges(&state);
        Ok(())
    }

    /// Book an exit and return the realized P&L in dollars.
    ///
    /// Idempotent: with no open position the ledger is untouched and the
    /// result is zero.
    pub fn record_exit(&self, ticker: &str, exit_price: u32) -> Decimal {
        self.record_exit_at(ticker, exit_price, Utc::now())
    }

    pub fn record_exit_at(&self, ticker: &str, exit_price: u32, now: DateTime<Utc>) -> Decimal {
        let mut state = self.state.lock().unwrap();
        let Some(position) = state.positions.remove(ticker) else {
            return Decimal::ZERO;
        };

        let pnl = position.unrealized_pnl(exit_price);
        state.daily_realized_pnl += pnl;
        state.cooldowns.insert(ticker.to_string(), now);
        Self::publish_gauges(&state);
        pnl
    }

    /// Ratchet a position's trailing stop on a new high
    pub fn update_trailing_stop(&self, ticker: &str, current_price: u32) {
        let mut state = self.state.lock().unwrap();
        if let Some(position) = state.positions.get_mut(ticker) {
            position.update_trailing_stop(current_price, self.config.trailing_stop_cents);
        }
    }

    pub fn get_position(&self, ticker: &str) -> Option<Position> {
        self.state.lock().unwrap().positions.get(ticker).cloned()
    }

    pub fn get_all_positions(&self) -> HashMap<String, Position> {
        self.state.lock().unwrap().positions.clone()
    }

    pub fn has_position(&self, ticker: &str) -> bool {
        self.state.lock().unwrap().positions.contains_key(ticker)
    }

    pub fn get_summary(&self) -> RiskSummary {
        let state = self.state.lock().unwrap();
        RiskSummary {
            open_positions: state.positions.len(),
            total_exposure: state.total_exposure(),
            daily_pnl: state.daily_realized_pnl,
            circuit_breaker: state.circuit_breaker_tripped,
            max_daily_loss: self.config.max_daily_loss,
            max_exposure: self.config.max_total_exposure,
        }
    }

    /// Clear daily P&L and the circuit breaker. Explicit only; the ledger
    /// never rolls the day over on its own.
    pub fn reset_daily(&self) {
        let mut state = self.state.lock().unwrap();
        state.daily_realized_pnl = Decimal::ZERO;
        state.circuit_breaker_tripped = false;
        Self::publish_gauges(&state);
        tracing::info!("Daily risk counters reset");
    }

    fn publish_gauges(state: &LedgerState) {
        set_gauge(GaugeMetric::OpenPositions, state.positions.len() as f64);
        set_gauge(
            GaugeMetric::TotalExposure,
            state.total_exposure().to_f64().unwrap_or(0.0),
        );
        set_gauge(
            GaugeMetric::DailyPnl,
            state.daily_realized_pnl.to_f64().unwrap_or(0.0),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::OrderSide;
    use rust_decimal_macros::dec;

    fn config() -> RiskConfig {
        RiskConfig {
            order_size: 5,
            max_position_per_market: 50,
            max_total_exposure: dec!(500),
            stop_loss_cents: 2,
            trailing_stop_cents: 2,
            fee_cents: 1,
            max_daily_loss: dec!(50),
            cooldown_seconds: 2,
        }
    }

    fn position(ticker: &str, quantity: u32, entry: u32, at: DateTime<Utc>) -> Position {
        Position {
            ticker: ticker.into(),
            side: OrderSide::Yes,
            quantity,
            entry_price: entry,
            stop_loss_price: entry.saturating_sub(3).max(1),
            trailing_stop_price: entry.saturating_sub(2).max(1),
            highest_price: entry,
            entry_time: at,
            order_id: "o".into(),
        }
    }

    #[test]
    fn test_entry_exit_pnl_flow() {
        let ledger = RiskLedger::new(config());
        let now = Utc::now();

        ledger
            .record_entry_at(position("A", 10, 50, now), now)
            .unwrap();
        assert!(ledger.has_position("A"));

        let pnl = ledger.record_exit_at("A", 55, now + Duration::seconds(10));
        assert_eq!(pnl, dec!(0.5));
        assert!(!ledger.has_position("A"));
        assert_eq!(ledger.get_summary().daily_pnl, dec!(0.5));
    }

    #[test]
    fn test_record_exit_idempotent() {
        let ledger = RiskLedger::new(config());
        let now = Utc::now();

        ledger
            .record_entry_at(position("A", 10, 50, now), now)
            .unwrap();
        let first = ledger.record_exit_at("A", 45, now + Duration::seconds(5));
        assert_eq!(first, dec!(-0.5));

        // Second exit finds nothing and changes nothing
        let second = ledger.record_exit_at("A", 45, now + Duration::seconds(6));
        assert_eq!(second, Decimal::ZERO);
        assert_eq!(ledger.get_summary().daily_pnl, dec!(-0.5));
    }

    #[test]
    fn test_cooldown_after_entry() {
        let ledger = RiskLedger::new(config());
        let now = Utc::now();

        ledger
            .record_entry_at(position("A", 5, 50, now), now)
            .unwrap();
        ledger.record_exit_at("A", 50, now + Duration::seconds(3));

        // 1s after the exit, still cooling down
        let denial = ledger
            .check_can_trade_at("A", 5, 50, now + Duration::seconds(4))
            .unwrap_err();
        assert!(matches!(denial, RiskDenial::Cooldown { .. }));

        // Past the 2s cooldown
        assert!(ledger
            .check_can_trade_at("A", 5, 50, now + Duration::seconds(6))
            .is_ok());
    }

    #[test]
    fn test_cooldown_is_per_market() {
        let ledger = RiskLedger::new(config());
        let now = Utc::now();

        ledger
            .record_entry_at(position("A", 5, 50, now), now)
            .unwrap();
        assert!(ledger.check_can_trade_at("B", 5, 50, now).is_ok());
    }

    #[test]
    fn test_market_position_cap() {
        let ledger = RiskLedger::new(config());
        let now = Utc::now();

        ledger
            .record_entry_at(position("A", 48, 50, now), now)
            .unwrap();
        let denial = ledger
            .check_can_trade_at("A", 5, 50, now + Duration::seconds(10))
            .unwrap_err();
        assert_eq!(
            denial,
            RiskDenial::MarketCap {
                held: 48,
                requested: 5,
                cap: 50
            }
        );
    }

    #[test]
    fn test_exposure_cap_counts_all_markets() {
        let mut cfg = config();
        cfg.max_total_exposure = dec!(100);
        let ledger = RiskLedger::new(cfg);
        let now = Utc::now();

        // $49.50 in each of two markets, $99 total
        ledger
            .record_entry_at(position("A", 50, 99, now), now)
            .unwrap();
        ledger
            .record_entry_at(position("B", 50, 99, now), now)
            .unwrap();

        // $2.50 more would breach the $100 cap
        let denial = ledger
            .check_can_trade_at("C", 5, 50, now + Duration::seconds(10))
            .unwrap_err();
        assert!(matches!(denial, RiskDenial::ExposureCap { .. }));
    }

    #[test]
    fn test_daily_loss_trips_breaker_and_stays_tripped() {
        let ledger = RiskLedger::new(config());
        let now = Utc::now();

        // 100 contracts dropping 51c realizes -$51
        ledger
            .record_entry_at(position("A", 50, 90, now), now)
            .unwrap();
        ledger
            .record_entry_at(position("B", 50, 90, now), now)
            .unwrap();
        ledger.record_exit_at("A", 39, now + Duration::seconds(3));
        ledger.record_exit_at("B", 39, now + Duration::seconds(3));
        assert_eq!(ledger.get_summary().daily_pnl, dec!(-51));

        let denial = ledger
            .check_can_trade_at("C", 5, 50, now + Duration::seconds(10))
            .unwrap_err();
        assert!(matches!(denial, RiskDenial::DailyLossExceeded { .. }));

        // Tripped breaker short-circuits everything afterwards
        let denial = ledger
            .check_can_trade_at("D", 1, 1, now + Duration::seconds(20))
            .unwrap_err();
        assert_eq!(denial, RiskDenial::CircuitBreaker);
        assert!(ledger.get_summary().circuit_breaker);
    }

    #[test]
    fn test_reset_daily_clears_breaker() {
        let ledger = RiskLedger::new(config());
        let now = Utc::now();

        // 100 contracts dropping 89c realizes -$89, past the $50 bound
        ledger
            .record_entry_at(position("A", 50, 90, now), now)
            .unwrap();
        ledger
            .record_entry_at(position("B", 50, 90, now), now)
            .unwrap();
        ledger.record_exit_at("A", 1, now + Duration::seconds(3));
        ledger.record_exit_at("B", 1, now + Duration::seconds(3));
        assert_eq!(ledger.get_summary().daily_pnl, dec!(-89));
        assert!(ledger
            .check_can_trade_at("C", 5, 50, now + Duration::seconds(10))
            .is_err());

        ledger.reset_daily();
        assert_eq!(ledger.get_summary().daily_pnl, Decimal::ZERO);
        assert!(ledger
            .check_can_trade_at("C", 5, 50, now + Duration::seconds(10))
            .is_ok());
    }

    #[test]
    fn test_record_entry_revalidates_under_lock() {
        let mut cfg = config();
        cfg.max_total_exposure = dec!(80);
        let ledger = RiskLedger::new(cfg);
        let now = Utc::now();

        // Pre-check passes for both, but booking the second breaches the cap
        assert!(ledger.check_can_trade_at("A", 50, 99, now).is_ok());
        assert!(ledger.check_can_trade_at("B", 50, 99, now).is_ok());

        ledger
            .record_entry_at(position("A", 50, 99, now), now)
            .unwrap();
        let denial = ledger
            .record_entry_at(position("B", 50, 99, now), now)
            .unwrap_err();
        assert!(matches!(denial, RiskDenial::ExposureCap { .. }));
        assert!(!ledger.has_position("B"));
    }

    #[test]
    fn test_trailing_stop_updates_through_ledger() {
        let ledger = RiskLedger::new(config());
        let now = Utc::now();

        ledger
            .record_entry_at(position("A", 10, 50, now), now)
            .unwrap();
        ledger.update_trailing_stop("A", 60);

        let pos = ledger.get_position("A").unwrap();
        assert_eq!(pos.highest_price, 60);
        assert_eq!(pos.trailing_stop_price, 58);

        // Unknown ticker is a no-op
        ledger.update_trailing_stop("MISSING", 60);
    }
}
