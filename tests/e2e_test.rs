//! Engine lifecycle tests with a stubbed exchange

use async_trait::async_trait;
use kalshi_momentum::config::Config;
use kalshi_momentum::feed::PriceFeed;
use kalshi_momentum::gateway::{
    GatewayError, MarketDiscovery, MarketInfo, OrderGateway, PaperGateway,
};
use kalshi_momentum::orchestrator::Orchestrator;
use kalshi_momentum::risk::RiskLedger;
use kalshi_momentum::tracker::TradeTracker;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

struct StubDiscovery {
    markets: Vec<MarketInfo>,
}

#[async_trait]
impl MarketDiscovery for StubDiscovery {
    async fn discover_markets(&self) -> Result<Vec<MarketInfo>, GatewayError> {
        Ok(self.markets.clone())
    }
}

fn liquid_market(ticker: &str, volume: u64) -> MarketInfo {
    serde_json::from_value(serde_json::json!({
        "ticker": ticker,
        "yes_bid": 30,
        "yes_ask": 34,
        "no_bid": 66,
        "volume": volume,
    }))
    .unwrap()
}

fn engine(markets: Vec<MarketInfo>, dir: &tempfile::TempDir) -> Arc<Orchestrator> {
    let config = Config::default();
    let gateway: Arc<dyn OrderGateway> = Arc::new(PaperGateway::new(dec!(1000)));
    let discovery: Arc<dyn MarketDiscovery> = Arc::new(StubDiscovery { markets });
    let risk = Arc::new(RiskLedger::new(config.risk.clone()));
    let tracker = Arc::new(TradeTracker::new(dir.path().join("trades.json")));
    // Unroutable endpoint; the feed retries in the background until shutdown
    let feed = PriceFeed::new("ws://127.0.0.1:1/ws");
    Orchestrator::new(config, gateway, discovery, risk, tracker, feed)
}

#[tokio::test]
async fn test_engine_starts_and_stops_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = engine(
        vec![
            liquid_market("MKT-A", 500),
            liquid_market("MKT-B", 400),
            liquid_market("MKT-C", 300),
        ],
        &dir,
    );

    let runner = tokio::spawn(Arc::clone(&orchestrator).run());
    tokio::time::sleep(Duration::from_millis(300)).await;
    orchestrator.stop();

    let result = tokio::time::timeout(Duration::from_secs(10), runner)
        .await
        .expect("engine did not shut down in time")
        .expect("engine task panicked");
    assert!(result.is_ok(), "engine exited with error: {result:?}");
}

#[tokio::test]
async fn test_engine_fails_without_tradable_markets() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = engine(vec![], &dir);

    let result = orchestrator.run().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_starting_balance_recorded_on_startup() {
    let dir = tempfile::tempdir().unwrap();
    let journal = dir.path().join("trades.json");

    {
        let config = Config::default();
        let gateway: Arc<dyn OrderGateway> = Arc::new(PaperGateway::new(dec!(250)));
        let discovery: Arc<dyn MarketDiscovery> = Arc::new(StubDiscovery {
            markets: vec![liquid_market("MKT-A", 500)],
        });
        let risk = Arc::new(RiskLedger::new(config.risk.clone()));
        let tracker = Arc::new(TradeTracker::new(&journal));
        let feed = PriceFeed::new("ws://127.0.0.1:1/ws");
        let orchestrator = Orchestrator::new(config, gateway, discovery, risk, tracker, feed);

        let runner = tokio::spawn(Arc::clone(&orchestrator).run());
        tokio::time::sleep(Duration::from_millis(200)).await;
        orchestrator.stop();
        let _ = tokio::time::timeout(Duration::from_secs(10), runner).await;
    }

    let restored = TradeTracker::new(&journal);
    assert_eq!(restored.get_summary().starting_balance, dec!(250));
}
