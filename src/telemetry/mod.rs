//! Telemetry module
//!
//! Metrics and structured logging

mod logging;
mod metrics;

pub use logging::init_logging;
pub use metrics::{incr_counter, set_gauge, CounterMetric, GaugeMetric};

use crate::config::TelemetryConfig;

/// Initialize logging and the Prometheus metrics exporter
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    init_logging(&config.log_level)?;
    metrics::init_metrics(config.metrics_port)?;
    Ok(())
}
