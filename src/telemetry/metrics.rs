//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Momentum signals detected
    SignalsDetected,
    /// Position entries
    Entries,
    /// Position exits
    Exits,
    /// Risk ledger denials
    RiskDenials,
    /// Feed reconnect attempts
    FeedReconnects,
    /// Malformed feed messages dropped
    MalformedMessages,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Daily realized P&L
    DailyPnl,
    /// Open position count
    OpenPositions,
    /// Total exposure in dollars
    TotalExposure,
    /// Active trader count
    ActiveTraders,
}

impl CounterMetric {
    fn name(self) -> &'static str {
        match self {
            CounterMetric::SignalsDetected => "kmom_signals_detected_total",
            CounterMetric::Entries => "kmom_entries_total",
            CounterMetric::Exits => "kmom_exits_total",
            CounterMetric::RiskDenials => "kmom_risk_denials_total",
            CounterMetric::FeedReconnects => "kmom_feed_reconnects_total",
            CounterMetric::MalformedMessages => "kmom_malformed_messages_total",
        }
    }
}

impl GaugeMetric {
    fn name(self) -> &'static str {
        match self {
            GaugeMetric::DailyPnl => "kmom_daily_pnl_usd",
            GaugeMetric::OpenPositions => "kmom_open_positions",
            GaugeMetric::TotalExposure => "kmom_total_exposure_usd",
            GaugeMetric::ActiveTraders => "kmom_active_traders",
        }
    }
}

/// Start the Prometheus scrape endpoint
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;
    Ok(())
}

/// Increment a counter
pub fn incr_counter(metric: CounterMetric) {
    metrics::counter!(metric.name()).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    metrics::gauge!(metric.name()).set(value);
}
