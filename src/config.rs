//! Configuration types for kalshi-momentum

use rust_decimal::Decimal;
use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub liquidity: LiquidityConfig,
    #[serde(default)]
    pub momentum: MomentumConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub trader: TraderConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Order gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Execution mode: paper or live
    #[serde(default)]
    pub mode: GatewayMode,
    /// Use the demo exchange environment
    #[serde(default = "default_true")]
    pub use_demo: bool,
    /// API key for authenticated endpoints
    #[serde(default)]
    pub api_key: String,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Starting balance for paper mode, in dollars
    #[serde(default = "default_paper_balance")]
    pub paper_balance: Decimal,
}

/// Paper trading or live execution
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    #[default]
    Paper,
    Live,
}

impl GatewayConfig {
    /// REST API base URL for the configured environment
    pub fn rest_url(&self) -> &'static str {
        if self.use_demo {
            "https://demo-api.kalshi.co/trade-api/v2"
        } else {
            "https://trading-api.kalshi.co/trade-api/v2"
        }
    }

    /// WebSocket URL for the configured environment
    pub fn ws_url(&self) -> &'static str {
        if self.use_demo {
            "wss://demo-api.kalshi.co/trade-api/ws/v2"
        } else {
            "wss://trading-api.kalshi.co/trade-api/ws/v2"
        }
    }
}

/// Liquidity filter configuration for market selection
#[derive(Debug, Clone, Deserialize)]
pub struct LiquidityConfig {
    /// Minimum contract volume for the strict filter
    #[serde(default = "default_min_volume")]
    pub min_volume: u64,
    /// Maximum bid-ask spread in cents
    #[serde(default = "default_max_spread")]
    pub max_spread_cents: u32,
}

/// Momentum detection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MomentumConfig {
    /// Trailing window for gap/price change measurement (seconds)
    #[serde(default = "default_momentum_window")]
    pub window_seconds: u64,
    /// Minimum YES price movement to trigger an entry (cents)
    #[serde(default = "default_entry_threshold")]
    pub entry_threshold_cents: u32,
    /// Gap shrink required to signal convergence momentum
    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: Decimal,
}

/// Risk limit configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Contracts per order
    #[serde(default = "default_order_size")]
    pub order_size: u32,
    /// Maximum contracts held in a single market
    #[serde(default = "default_max_position")]
    pub max_position_per_market: u32,
    /// Maximum total dollars at risk across markets
    #[serde(default = "default_max_exposure")]
    pub max_total_exposure: Decimal,
    /// Stop loss distance from entry (cents)
    #[serde(default = "default_stop_loss")]
    pub stop_loss_cents: u32,
    /// Trailing stop distance (cents)
    #[serde(default = "default_trailing_stop")]
    pub trailing_stop_cents: u32,
    /// Exchange fee per contract (cents), folded into the stop-loss buffer
    #[serde(default = "default_fee")]
    pub fee_cents: u32,
    /// Daily realized loss that trips the circuit breaker (dollars)
    #[serde(default = "default_max_daily_loss")]
    pub max_daily_loss: Decimal,
    /// Minimum wait between trades on the same market (seconds)
    #[serde(default = "default_cooldown")]
    pub cooldown_seconds: u64,
}

/// Per-market trader loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TraderConfig {
    /// Main loop tick interval in milliseconds (5 Hz default)
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Signal analysis cadence in milliseconds (2 Hz default)
    #[serde(default = "default_analysis_interval")]
    pub analysis_interval_ms: u64,
    /// Pause trading when no price update for this long (seconds)
    #[serde(default = "default_stale_data")]
    pub stale_data_secs: u64,
}

/// Market scanner configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Maximum markets traded concurrently
    #[serde(default = "default_max_markets")]
    pub max_markets: usize,
    /// Rescan interval for new/lost liquidity (seconds)
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
    /// Status report interval (seconds)
    #[serde(default = "default_status_interval")]
    pub status_interval_secs: u64,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_true() -> bool {
    true
}
fn default_request_timeout() -> u64 {
    10
}
fn default_paper_balance() -> Decimal {
    Decimal::from(1000)
}
fn default_min_volume() -> u64 {
    100
}
fn default_max_spread() -> u32 {
    10
}
fn default_momentum_window() -> u64 {
    5
}
fn default_entry_threshold() -> u32 {
    2
}
fn default_convergence_threshold() -> Decimal {
    Decimal::from(5)
}
fn default_order_size() -> u32 {
    5
}
fn default_max_position() -> u32 {
    50
}
fn default_max_exposure() -> Decimal {
    Decimal::from(500)
}
fn default_stop_loss() -> u32 {
    2
}
fn default_trailing_stop() -> u32 {
    2
}
fn default_fee() -> u32 {
    1
}
fn default_max_daily_loss() -> Decimal {
    Decimal::from(50)
}
fn default_cooldown() -> u64 {
    2
}
fn default_tick_interval() -> u64 {
    200
}
fn default_analysis_interval() -> u64 {
    500
}
fn default_stale_data() -> u64 {
    10
}
fn default_max_markets() -> usize {
    10
}
fn default_scan_interval() -> u64 {
    60
}
fn default_status_interval() -> u64 {
    30
}
fn default_metrics_port() -> u16 {
    9090
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mode: GatewayMode::Paper,
            use_demo: true,
            api_key: String::new(),
            request_timeout_secs: default_request_timeout(),
            paper_balance: default_paper_balance(),
        }
    }
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            min_volume: default_min_volume(),
            max_spread_cents: default_max_spread(),
        }
    }
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_momentum_window(),
            entry_threshold_cents: default_entry_threshold(),
            convergence_threshold: default_convergence_threshold(),
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            order_size: default_order_size(),
            max_position_per_market: default_max_position(),
            max_total_exposure: default_max_exposure(),
            stop_loss_cents: default_stop_loss(),
            trailing_stop_cents: default_trailing_stop(),
            fee_cents: default_fee(),
            max_daily_loss: default_max_daily_loss(),
            cooldown_seconds: default_cooldown(),
        }
    }
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            analysis_interval_ms: default_analysis_interval(),
            stale_data_secs: default_stale_data(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_markets: default_max_markets(),
            scan_interval_secs: default_scan_interval(),
            status_interval_secs: default_status_interval(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: default_metrics_port(),
            log_level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            liquidity: LiquidityConfig::default(),
            momentum: MomentumConfig::default(),
            risk: RiskConfig::default(),
            trader: TraderConfig::default(),
            scanner: ScannerConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
