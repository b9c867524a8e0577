//! The per-market trading state machine

use super::types::{PositionStatus, TraderStats, TraderStatus};
use crate::config::Config;
use crate::feed::MarketUpdate;
use crate::gateway::{OrderAction, OrderGateway};
use crate::market::MarketState;
use crate::risk::{Position, RiskLedger};
use crate::strategy::{ExitReason, MomentumSignal, MomentumStrategy};
use crate::telemetry::{incr_counter, CounterMetric};
use crate::tracker::TradeTracker;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

/// Pause between the exit and re-entry legs of a reversal
const REVERSAL_PAUSE: std::time::Duration = std::time::Duration::from_millis(500);

/// Signals below this confidence are not worth logging
const LOG_CONFIDENCE: Decimal = dec!(0.3);

/// Trades one market: consumes its price updates, runs the strategy on a
/// fixed cadence, and manages at most one open position.
pub struct MarketTrader {
    ticker: String,
    order_size: u32,
    trailing_stop_cents: u32,
    tick_interval: std::time::Duration,
    analysis_interval: Duration,
    stale_after: Duration,
    strategy: MomentumStrategy,
    state: MarketState,
    gateway: Arc<dyn OrderGateway>,
    risk: Arc<RiskLedger>,
    tracker: Arc<TradeTracker>,
    updates: mpsc::Receiver<MarketUpdate>,
    position: Option<Position>,
    stats: TraderStats,
    status: Arc<Mutex<TraderStatus>>,
    last_analysis: Option<DateTime<Utc>>,
}

impl MarketTrader {
    pub fn new(
        ticker: impl Into<String>,
        config: &Config,
        gateway: Arc<dyn OrderGateway>,
        risk: Arc<RiskLedger>,
        tracker: Arc<TradeTracker>,
        updates: mpsc::Receiver<MarketUpdate>,
    ) -> Self {
        let ticker = ticker.into();
        Self {
            state: MarketState::new(ticker.clone()),
            status: Arc::new(Mutex::new(TraderStatus {
                ticker: ticker.clone(),
                ..TraderStatus::default()
            })),
            ticker,
            order_size: config.risk.order_size,
            trailing_stop_cents: config.risk.trailing_stop_cents,
            tick_interval: std::time::Duration::from_millis(config.trader.tick_interval_ms),
            analysis_interval: Duration::milliseconds(config.trader.analysis_interval_ms as i64),
            stale_after: Duration::seconds(config.trader.stale_data_secs as i64),
            strategy: MomentumStrategy::new(config.momentum.clone(), config.risk.clone()),
            gateway,
            risk,
            tracker,
            updates,
            position: None,
            stats: TraderStats::default(),
            last_analysis: None,
        }
    }

    /// Shared cell the trader publishes its status into every tick
    pub fn status_handle(&self) -> Arc<Mutex<TraderStatus>> {
        Arc::clone(&self.status)
    }

    /// Drive the trader until shutdown, then flatten any open position
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(ticker = %self.ticker, "Trader started");

        let mut tick = tokio::time::interval(self.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.drain_updates();
                    self.tick(Utc::now()).await;
                    self.publish_status();
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.flatten_for_shutdown().await;
        tracing::info!(ticker = %self.ticker, "Trader stopped");
    }

    /// Apply every queued feed update without blocking
    fn drain_updates(&mut self) {
        while let Ok(update) = self.updates.try_recv() {
            self.state.apply(&update);
        }
    }

    async fn tick(&mut self, now: DateTime<Utc>) {
        // No fresh data, no trading
        if self.state.is_stale(now, self.stale_after) {
            return;
        }

        if self.position.is_some() {
            self.check_exits().await;
        }

        let due = match self.last_analysis {
            None => true,
            Some(last) => now - last >= self.analysis_interval,
        };
        if due {
            self.last_analysis = Some(now);
            self.analyze_and_trade(now).await;
        }
    }

    async fn analyze_and_trade(&mut self, now: DateTime<Utc>) {
        let Some(signal) = self.strategy.analyze_at(&self.state, now) else {
            return;
        };

        self.stats.signals_detected += 1;
        incr_counter(CounterMetric::SignalsDetected);
        if signal.confidence >= LOG_CONFIDENCE {
            tracing::info!(
                ticker = %self.ticker,
                signal = ?signal.signal,
                gap_change = %signal.gap_change,
                yes_change = %signal.yes_price_change,
                confidence = %signal.confidence,
                "Momentum signal"
            );
        }

        match &self.position {
            None => self.try_enter(&signal).await,
            Some(position) => {
                if let Some(reason) = self.strategy.should_reverse(&signal, position) {
                    self.reverse_position(&signal, reason).await;
                }
            }
        }
    }

    async fn try_enter(&mut self, signal: &MomentumSignal) {
        let Some((side, price)) = self.strategy.entry_plan(signal) else {
            return;
        };

        if let Err(denial) = self.risk.check_can_trade(&self.ticker, self.order_size, price) {
            tracing::debug!(ticker = %self.ticker, %denial, "Entry blocked");
            return;
        }

        let stop_loss = self.strategy.stop_loss_price(price);
        let trailing_stop = self.strategy.initial_trailing_stop(price);
        tracing::info!(
            ticker = %self.ticker,
            %side,
            price,
            stop_loss,
            trailing_stop,
            "Entering position"
        );

        let order_id = match self
            .gateway
            .place_order(&self.ticker, side, OrderAction::Buy, price, self.order_size)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(ticker = %self.ticker, error = %e, "Entry order failed");
                return;
            }
        };

        let position = Position {
            ticker: self.ticker.clone(),
            side,
            quantity: self.order_size,
            entry_price: price,
            stop_loss_price: stop_loss,
            trailing_stop_price: trailing_stop,
            highest_price: price,
            entry_time: Utc::now(),
            order_id: order_id.clone(),
        };

        if let Err(denial) = self.risk.record_entry(position.clone()) {
            // Lost the race against another trader's fill; unwind ours
            tracing::warn!(ticker = %self.ticker, %denial, "Entry denied at booking, unwinding");
            if let Err(e) = self
                .gateway
                .place_order(&self.ticker, side, OrderAction::Sell, price, self.order_size)
                .await
            {
                tracing::error!(ticker = %self.ticker, error = %e, "Unwind order failed");
            }
            return;
        }

        self.tracker.record_trade(
            &self.ticker,
            side,
            OrderAction::Buy,
            price,
            self.order_size,
            &order_id,
            Decimal::ZERO,
            None,
        );
        self.stats.entries += 1;
        incr_counter(CounterMetric::Entries);
        self.position = Some(position);
    }

    async fn check_exits(&mut self) {
        let Some(position) = &mut self.position else {
            return;
        };

        let current_price = self.state.price_for_side(position.side);
        if current_price == 0 {
            return;
        }

        // Ratchet both the local and the booked trailing stop on a new high
        if current_price > position.highest_price {
            position.update_trailing_stop(current_price, self.trailing_stop_cents);
            self.risk.update_trailing_stop(&self.ticker, current_price);
        }

        if let Some(reason) = self.strategy.should_exit(position, current_price) {
            self.exit_position(current_price, reason).await;
        }
    }

    async fn exit_position(&mut self, exit_price: u32, reason: ExitReason) {
        let Some(position) = &self.position else {
            return;
        };
        let side = position.side;
        let quantity = position.quantity;
        let price = exit_price.clamp(1, 99);

        tracing::info!(ticker = %self.ticker, %side, price, %reason, "Exiting position");

        let order_id = match self
            .gateway
            .place_order(&self.ticker, side, OrderAction::Sell, price, quantity)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                // Position stays open; the next tick retries
                tracing::warn!(ticker = %self.ticker, error = %e, "Exit order failed");
                return;
            }
        };

        let pnl = self.risk.record_exit(&self.ticker, price);
        self.tracker.record_trade(
            &self.ticker,
            side,
            OrderAction::Sell,
            price,
            quantity,
            &order_id,
            pnl,
            Some(reason.as_str()),
        );

        self.stats.exits += 1;
        incr_counter(CounterMetric::Exits);
        match reason {
            ExitReason::StopLoss => self.stats.stop_losses += 1,
            ExitReason::TrailingStop => self.stats.trailing_stops += 1,
            _ => {}
        }
        tracing::info!(ticker = %self.ticker, %reason, %pnl, "Exit filled");
        self.position = None;
    }

    async fn reverse_position(&mut self, signal: &MomentumSignal, reason: ExitReason) {
        let Some(position) = &self.position else {
            return;
        };
        let exit_price = self.state.price_for_side(position.side);
        if exit_price == 0 {
            return;
        }

        tracing::info!(ticker = %self.ticker, %reason, "Reversing position");
        self.exit_position(exit_price, reason).await;
        if self.position.is_some() {
            // Exit leg failed; try again next tick
            return;
        }

        self.stats.reversals += 1;
        tokio::time::sleep(REVERSAL_PAUSE).await;
        // Cooldown or other limits may still veto the re-entry leg
        self.try_enter(signal).await;
    }

    async fn flatten_for_shutdown(&mut self) {
        let Some(position) = &self.position else {
            return;
        };
        let price = self.state.price_for_side(position.side);
        if price > 0 {
            self.exit_position(price, ExitReason::Shutdown).await;
        } else {
            tracing::warn!(ticker = %self.ticker, "No usable price to flatten on shutdown");
        }
    }

    fn publish_status(&self) {
        let position = self.position.as_ref().map(|p| {
            let current_price = self.state.price_for_side(p.side);
            PositionStatus {
                side: p.side,
                quantity: p.quantity,
                entry_price: p.entry_price,
                current_price,
                stop_loss_price: p.stop_loss_price,
                trailing_stop_price: p.trailing_stop_price,
                unrealized_pnl: p.unrealized_pnl(current_price),
            }
        });

        let mut status = self.status.lock().unwrap();
        *status = TraderStatus {
            ticker: self.ticker.clone(),
            yes_bid: self.state.yes_bid,
            yes_ask: self.state.yes_ask,
            no_bid: self.state.no_bid,
            gap: self.state.gap(),
            position,
            stats: self.stats,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::gateway::{OrderSide, PaperGateway};
    use tempfile::tempdir;

    struct Fixture {
        trader: MarketTrader,
        _dir: tempfile::TempDir,
        feed_tx: mpsc::Sender<MarketUpdate>,
    }

    fn fixture(config: Config) -> Fixture {
        let dir = tempdir().unwrap();
        let gateway: Arc<dyn OrderGateway> = Arc::new(PaperGateway::new(dec!(1000)));
        let risk = Arc::new(RiskLedger::new(config.risk.clone()));
        let tracker = Arc::new(TradeTracker::new(dir.path().join("trades.json")));
        let (feed_tx, feed_rx) = mpsc::channel(64);
        let trader = MarketTrader::new("T", &config, gateway, risk, tracker, feed_rx);
        Fixture {
            trader,
            _dir: dir,
            feed_tx,
        }
    }

    fn bullish_config() -> Config {
        let mut config = Config::default();
        config.momentum.convergence_threshold = dec!(3);
        config.risk.cooldown_seconds = 0;
        config
    }

    fn snapshot(yes_bid: u32, yes_ask: u32, no_bid: u32, no_ask: u32) -> MarketUpdate {
        MarketUpdate::Snapshot {
            yes_bid,
            yes_ask,
            no_bid,
            no_ask,
        }
    }

    /// Seed history that produces a bullish convergence signal at `now`
    fn seed_bullish(trader: &mut MarketTrader, now: DateTime<Utc>) {
        trader
            .state
            .apply_at(&snapshot(30, 34, 60, 64), now - Duration::seconds(5));
        trader
            .state
            .apply_at(&snapshot(31, 35, 60, 64), now - Duration::seconds(3));
        trader.state.apply_at(&snapshot(34, 38, 60, 64), now);
    }

    #[tokio::test]
    async fn test_entry_on_bullish_signal() {
        let mut f = fixture(bullish_config());
        let now = Utc::now();
        seed_bullish(&mut f.trader, now);

        f.trader.analyze_and_trade(now).await;

        let position = f.trader.position.as_ref().unwrap();
        assert_eq!(position.side, OrderSide::Yes);
        assert_eq!(position.entry_price, 37);
        assert_eq!(position.stop_loss_price, 34); // 37 - (2 stop + 1 fee)
        assert_eq!(position.trailing_stop_price, 35);
        assert_eq!(f.trader.stats.entries, 1);
        assert_eq!(f.trader.stats.signals_detected, 1);
        assert!(f.trader.risk.has_position("T"));
    }

    #[tokio::test]
    async fn test_no_entry_when_risk_denies() {
        let mut config = bullish_config();
        config.risk.max_total_exposure = dec!(1);
        let mut f = fixture(config);
        let now = Utc::now();
        seed_bullish(&mut f.trader, now);

        f.trader.analyze_and_trade(now).await;

        assert!(f.trader.position.is_none());
        assert_eq!(f.trader.stats.entries, 0);
        // Signal was still observed
        assert_eq!(f.trader.stats.signals_detected, 1);
    }

    #[tokio::test]
    async fn test_stop_loss_exit() {
        let mut f = fixture(bullish_config());
        let now = Utc::now();
        seed_bullish(&mut f.trader, now);
        f.trader.analyze_and_trade(now).await;
        assert!(f.trader.position.is_some());

        // Price collapses through the stop at 34
        f.trader.state.apply(&snapshot(32, 34, 64, 68));
        f.trader.check_exits().await;

        assert!(f.trader.position.is_none());
        assert_eq!(f.trader.stats.exits, 1);
        assert_eq!(f.trader.stats.stop_losses, 1);
        assert!(!f.trader.risk.has_position("T"));
        // Entered at 37, exited at 33: -4c on 5 contracts
        assert_eq!(f.trader.tracker.realized_pnl(), dec!(-0.20));
    }

    #[tokio::test]
    async fn test_trailing_stop_ratchets_then_exits() {
        let mut f = fixture(bullish_config());
        let now = Utc::now();
        seed_bullish(&mut f.trader, now);
        f.trader.analyze_and_trade(now).await;

        // Price runs to 60: trailing stop ratchets to 58
        f.trader.state.apply(&snapshot(58, 62, 38, 42));
        f.trader.check_exits().await;
        let position = f.trader.position.as_ref().unwrap();
        assert_eq!(position.trailing_stop_price, 58);
        assert_eq!(position.highest_price, 60);

        // Pullback to 58 hits the trailing stop, not the stop loss
        f.trader.state.apply(&snapshot(56, 60, 40, 44));
        f.trader.check_exits().await;

        assert!(f.trader.position.is_none());
        assert_eq!(f.trader.stats.trailing_stops, 1);
        assert_eq!(f.trader.stats.stop_losses, 0);
        // Entered 37, exited 58: +21c on 5 contracts
        assert_eq!(f.trader.tracker.realized_pnl(), dec!(1.05));
    }

    #[tokio::test]
    async fn test_stale_market_pauses_trading() {
        let mut f = fixture(bullish_config());
        let now = Utc::now();
        seed_bullish(&mut f.trader, now);

        // Data is 11s old against a 10s staleness limit
        f.trader.tick(now + Duration::seconds(11)).await;
        assert!(f.trader.position.is_none());
        assert_eq!(f.trader.stats.signals_detected, 0);
    }

    #[tokio::test]
    async fn test_drain_applies_queued_updates() {
        let mut f = fixture(bullish_config());
        f.feed_tx.send(snapshot(30, 34, 60, 64)).await.unwrap();
        f.feed_tx.send(snapshot(34, 38, 60, 64)).await.unwrap();

        f.trader.drain_updates();
        assert_eq!(f.trader.state.yes_bid, 34);
        assert_eq!(f.trader.state.history_len(), 2);
    }

    #[tokio::test]
    async fn test_analysis_cadence_respected() {
        let mut f = fixture(bullish_config());
        let now = Utc::now();
        seed_bullish(&mut f.trader, now);

        f.trader.tick(now).await;
        assert_eq!(f.trader.stats.signals_detected, 1);

        // 200ms later the 500ms analysis interval has not elapsed
        f.trader.tick(now + Duration::milliseconds(200)).await;
        assert_eq!(f.trader.stats.signals_detected, 1);

        f.trader.tick(now + Duration::milliseconds(600)).await;
        assert_eq!(f.trader.stats.signals_detected, 2);
    }

    #[tokio::test]
    async fn test_status_reflects_position() {
        let mut f = fixture(bullish_config());
        let now = Utc::now();
        seed_bullish(&mut f.trader, now);
        f.trader.analyze_and_trade(now).await;
        f.trader.publish_status();

        let status = f.trader.status_handle();
        let status = status.lock().unwrap();
        assert_eq!(status.ticker, "T");
        let position = status.position.as_ref().unwrap();
        assert_eq!(position.entry_price, 37);
        assert_eq!(position.quantity, 5);
    }
}
