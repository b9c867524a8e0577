//! Shipped example configuration must load and match the documented defaults

use kalshi_momentum::config::{Config, GatewayMode};
use rust_decimal_macros::dec;

#[test]
fn test_example_config_loads() {
    let config = Config::load("config.toml.example").expect("example config must parse");

    assert_eq!(config.gateway.mode, GatewayMode::Paper);
    assert!(config.gateway.use_demo);
    assert_eq!(config.liquidity.min_volume, 100);
    assert_eq!(config.liquidity.max_spread_cents, 10);
    assert_eq!(config.momentum.window_seconds, 5);
    assert_eq!(config.momentum.entry_threshold_cents, 2);
    assert_eq!(config.momentum.convergence_threshold, dec!(5));
    assert_eq!(config.risk.order_size, 5);
    assert_eq!(config.risk.max_position_per_market, 50);
    assert_eq!(config.risk.max_total_exposure, dec!(500));
    assert_eq!(config.risk.max_daily_loss, dec!(50));
    assert_eq!(config.trader.tick_interval_ms, 200);
    assert_eq!(config.scanner.max_markets, 10);
    assert_eq!(config.telemetry.metrics_port, 9090);
}

#[test]
fn test_example_config_matches_builtin_defaults() {
    let from_file = Config::load("config.toml.example").unwrap();
    let defaults = Config::default();

    assert_eq!(
        from_file.momentum.convergence_threshold,
        defaults.momentum.convergence_threshold
    );
    assert_eq!(from_file.risk.order_size, defaults.risk.order_size);
    assert_eq!(from_file.risk.cooldown_seconds, defaults.risk.cooldown_seconds);
    assert_eq!(from_file.scanner.max_markets, defaults.scanner.max_markets);
    assert_eq!(from_file.trader.stale_data_secs, defaults.trader.stale_data_secs);
}
