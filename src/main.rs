use clap::Parser;
use kalshi_momentum::cli::{Cli, Commands};
use kalshi_momentum::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        toml::from_str(include_str!("../config.toml.example")).expect("Invalid default config")
    });

    kalshi_momentum::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            args.execute(config).await?;
        }
        Commands::Summary(args) => {
            args.execute()?;
        }
        Commands::Reset(args) => {
            args.execute()?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Gateway:  {:?} (demo: {})",
                config.gateway.mode, config.gateway.use_demo
            );
            println!(
                "  Momentum: window={}s entry>={}c convergence>{}",
                config.momentum.window_seconds,
                config.momentum.entry_threshold_cents,
                config.momentum.convergence_threshold
            );
            println!(
                "  Risk:     size={} max/mkt={} exposure<=${} daily_loss<=${}",
                config.risk.order_size,
                config.risk.max_position_per_market,
                config.risk.max_total_exposure,
                config.risk.max_daily_loss
            );
            println!(
                "  Scanner:  max_markets={} scan={}s",
                config.scanner.max_markets, config.scanner.scan_interval_secs
            );
        }
    }

    Ok(())
}
