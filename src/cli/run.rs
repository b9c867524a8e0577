//! Run command implementation

use crate::config::{Config, GatewayMode};
use crate::feed::PriceFeed;
use crate::gateway::{KalshiGateway, MarketDiscovery, OrderGateway, PaperGateway};
use crate::orchestrator::Orchestrator;
use crate::risk::RiskLedger;
use crate::tracker::TradeTracker;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Trade journal path
    #[arg(long, default_value = "momentum_trades.json")]
    pub journal: String,
}

impl RunArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let gateway: Arc<dyn OrderGateway> = match config.gateway.mode {
            GatewayMode::Paper => {
                tracing::info!(balance = %config.gateway.paper_balance, "Paper trading mode");
                Arc::new(PaperGateway::new(config.gateway.paper_balance))
            }
            GatewayMode::Live => {
                tracing::warn!(demo = config.gateway.use_demo, "Live trading mode");
                Arc::new(KalshiGateway::new(&config.gateway)?)
            }
        };
        // Discovery always runs against the REST API, even in paper mode
        let discovery: Arc<dyn MarketDiscovery> = Arc::new(KalshiGateway::new(&config.gateway)?);

        let risk = Arc::new(RiskLedger::new(config.risk.clone()));
        let tracker = Arc::new(TradeTracker::new(&self.journal));
        let feed = PriceFeed::new(config.gateway.ws_url());

        let orchestrator = Orchestrator::new(config, gateway, discovery, risk, tracker, feed);

        let interrupt_handle = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, shutting down");
                interrupt_handle.stop();
            }
        });

        orchestrator.run().await
    }
}
