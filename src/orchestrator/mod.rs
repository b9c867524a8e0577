//! Engine orchestration
//!
//! Owns the shared services, selects the tradable market set, runs one
//! trader task per market, and keeps the set current with a periodic
//! rescan. Shutdown is ordered: traders flatten and stop first, the feed
//! last, then a final status report.

mod scanner;

pub use scanner::{diff_markets, select_markets, LiquiditySnapshot, ScanDiff};

use crate::config::Config;
use crate::feed::PriceFeed;
use crate::gateway::{MarketDiscovery, OrderGateway};
use crate::risk::RiskLedger;
use crate::telemetry::{set_gauge, GaugeMetric};
use crate::tracker::TradeTracker;
use crate::trader::{MarketTrader, TraderStatus};
use anyhow::Context;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

struct TraderHandle {
    join: JoinHandle<()>,
    status: Arc<Mutex<TraderStatus>>,
    stop: watch::Sender<bool>,
}

/// Ties all components together and manages the trading lifecycle
pub struct Orchestrator {
    config: Config,
    gateway: Arc<dyn OrderGateway>,
    discovery: Arc<dyn MarketDiscovery>,
    risk: Arc<RiskLedger>,
    tracker: Arc<TradeTracker>,
    feed: Arc<PriceFeed>,
    traders: tokio::sync::Mutex<HashMap<String, TraderHandle>>,
    liquidity: Mutex<HashMap<String, LiquiditySnapshot>>,
    shutdown: watch::Sender<bool>,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        gateway: Arc<dyn OrderGateway>,
        discovery: Arc<dyn MarketDiscovery>,
        risk: Arc<RiskLedger>,
        tracker: Arc<TradeTracker>,
        feed: Arc<PriceFeed>,
    ) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            config,
            gateway,
            discovery,
            risk,
            tracker,
            feed,
            traders: tokio::sync::Mutex::new(HashMap::new()),
            liquidity: Mutex::new(HashMap::new()),
            shutdown,
        })
    }

    /// Request a graceful shutdown; `run` unwinds and returns
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Start the engine and block until shutdown
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        tracing::info!("Momentum engine starting");

        let balance = self
            .gateway
            .get_balance()
            .await
            .context("cannot read account balance")?;
        self.tracker.set_starting_balance(balance);
        tracing::info!(%balance, "Starting balance");

        let markets = self
            .discovery
            .discover_markets()
            .await
            .context("market discovery failed")?;
        tracing::info!(open_markets = markets.len(), "Discovered markets");

        let selected = select_markets(
            &markets,
            &self.config.liquidity,
            self.config.scanner.max_markets,
        );
        anyhow::ensure!(!selected.is_empty(), "no tradable markets found");

        for market in &selected {
            tracing::info!(
                ticker = %market.ticker,
                yes_bid = market.yes_bid,
                yes_ask = market.yes_ask,
                volume = market.volume,
                "Selected market"
            );
        }
        self.remember_liquidity(&selected);

        let tickers: Vec<String> = selected.iter().map(|m| m.ticker.clone()).collect();
        for ticker in &tickers {
            self.start_trader(ticker).await;
        }

        let feed_task = tokio::spawn(
            Arc::clone(&self.feed).run(tickers, self.shutdown.subscribe()),
        );
        let scanner_task = tokio::spawn(Arc::clone(&self).scanner_loop());
        let status_task = tokio::spawn(Arc::clone(&self).status_loop());
        tracing::info!(
            traders = selected.len(),
            scan_interval_secs = self.config.scanner.scan_interval_secs,
            "Engine running"
        );

        let mut shutdown = self.shutdown.subscribe();
        while !*shutdown.borrow() {
            if shutdown.changed().await.is_err() {
                break;
            }
        }

        tracing::info!("Shutting down");
        self.stop_all_traders().await;
        // The feed observes the same shutdown signal; wait for it to wind down
        let _ = feed_task.await;
        scanner_task.abort();
        status_task.abort();

        self.report_status().await;
        tracing::info!("Engine stopped");
        Ok(())
    }

    /// Spawn a trader for a market, registering its feed channel first so no
    /// update is lost between subscribe and start.
    async fn start_trader(&self, ticker: &str) {
        let mut traders = self.traders.lock().await;
        if traders.contains_key(ticker) {
            return;
        }

        let updates = self.feed.register(ticker);
        let trader = MarketTrader::new(
            ticker,
            &self.config,
            Arc::clone(&self.gateway),
            Arc::clone(&self.risk),
            Arc::clone(&self.tracker),
            updates,
        );
        let status = trader.status_handle();
        let (stop, stop_rx) = watch::channel(false);
        let join = tokio::spawn(trader.run(stop_rx));

        traders.insert(ticker.to_string(), TraderHandle { join, status, stop });
        set_gauge(GaugeMetric::ActiveTraders, traders.len() as f64);
    }

    /// Stop one trader and detach its market from the feed
    async fn stop_trader(&self, ticker: &str) {
        let handle = {
            let mut traders = self.traders.lock().await;
            let handle = traders.remove(ticker);
            set_gauge(GaugeMetric::ActiveTraders, traders.len() as f64);
            handle
        };
        let Some(handle) = handle else {
            return;
        };

        let _ = handle.stop.send(true);
        if let Err(e) = handle.join.await {
            tracing::warn!(ticker, error = %e, "Trader task ended abnormally");
        }
        self.feed.unregister(ticker);
        self.feed.unsubscribe(&[ticker.to_string()]).await;
    }

    async fn stop_all_traders(&self) {
        let tickers: Vec<String> = self.traders.lock().await.keys().cloned().collect();
        for ticker in tickers {
            self.stop_trader(&ticker).await;
        }
    }

    fn remember_liquidity(&self, selected: &[crate::gateway::MarketInfo]) {
        let mut liquidity = self.liquidity.lock().unwrap();
        for market in selected {
            liquidity.insert(market.ticker.clone(), LiquiditySnapshot::of(market));
        }
    }

    async fn scanner_loop(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        let interval = std::time::Duration::from_secs(self.config.scanner.scan_interval_secs);
        let mut tick = tokio::time::interval(interval);
        tick.tick().await; // the startup selection covers the first interval

        loop {
            tokio::select! {
                _ = tick.tick() => self.rescan().await,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    /// One scanner pass: pick up newly liquid markets, report improvements,
    /// and retire traders whose market went quiet, but never while they
    /// still hold a position.
    async fn rescan(&self) {
        let markets = match self.discovery.discover_markets().await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "Market rescan failed");
                return;
            }
        };

        let selected = select_markets(
            &markets,
            &self.config.liquidity,
            self.config.scanner.max_markets,
        );
        let traded: HashSet<String> = self.traders.lock().await.keys().cloned().collect();
        let diff = {
            let liquidity = self.liquidity.lock().unwrap();
            diff_markets(&selected, &traded, &liquidity)
        };

        for market in &diff.new_markets {
            if self.traders.lock().await.len() >= self.config.scanner.max_markets {
                break;
            }
            tracing::info!(
                ticker = %market.ticker,
                volume = market.volume,
                "New liquid market, starting trader"
            );
            self.start_trader(&market.ticker).await;
            self.feed.subscribe(&[market.ticker.clone()]).await;
        }

        for ticker in &diff.improved {
            tracing::info!(ticker, "Liquidity improving");
        }

        for ticker in &diff.lost {
            if self.risk.has_position(ticker) {
                tracing::info!(ticker, "Market lost liquidity, keeping trader with open position");
            } else {
                tracing::info!(ticker, "Market lost liquidity, retiring trader");
                self.stop_trader(ticker).await;
            }
        }

        self.remember_liquidity(&selected);
    }

    async fn status_loop(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        let interval = std::time::Duration::from_secs(self.config.scanner.status_interval_secs);
        let mut tick = tokio::time::interval(interval);
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => self.report_status().await,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    async fn report_status(&self) {
        let balance = match self.gateway.get_balance().await {
            Ok(b) => b.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Balance check failed");
                "unknown".to_string()
            }
        };
        let risk = self.risk.get_summary();
        let trades = self.tracker.get_summary();

        let traders = self.traders.lock().await;
        tracing::info!(
            balance = %balance,
            active_traders = traders.len(),
            realized_pnl = %trades.realized_pnl,
            total_trades = trades.total_trades,
            win_rate = trades.win_rate,
            exposure = %risk.total_exposure,
            max_exposure = %risk.max_exposure,
            circuit_breaker = risk.circuit_breaker,
            "Status"
        );

        for (ticker, handle) in traders.iter() {
            let status = handle.status.lock().unwrap().clone();
            if let Some(position) = &status.position {
                tracing::info!(
                    ticker,
                    gap = %status.gap,
                    signals = status.stats.signals_detected,
                    side = %position.side,
                    entry = position.entry_price,
                    current = position.current_price,
                    unrealized_pnl = %position.unrealized_pnl,
                    "Trader status"
                );
            } else {
                tracing::info!(
                    ticker,
                    gap = %status.gap,
                    signals = status.stats.signals_detected,
                    "Trader status"
                );
            }
        }
    }
}
