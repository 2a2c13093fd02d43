//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lifespan_setup_duration_seconds` (histogram): time spent in one lifespan's setup
//! - `lifespan_teardown_duration_seconds` (histogram): time spent in one lifespan's teardown
//! - `lifespan_failures_total` (counter): failed setups/teardowns by lifespan and phase
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder it is a no-op
//! - The Prometheus exporter is only installed by the binary

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::lifespan::error::Phase;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record how long a lifespan's setup or teardown took.
pub fn record_lifespan_duration(lifespan: &str, phase: Phase, elapsed: Duration) {
    let name = match phase {
        Phase::Startup => "lifespan_setup_duration_seconds",
        Phase::Shutdown => "lifespan_teardown_duration_seconds",
    };
    metrics::histogram!(name, "lifespan" => lifespan.to_string()).record(elapsed.as_secs_f64());
}

/// Record a failed setup or teardown.
pub fn record_lifespan_failure(lifespan: &str, phase: Phase) {
    metrics::counter!(
        "lifespan_failures_total",
        "lifespan" => lifespan.to_string(),
        "phase" => phase.as_str()
    )
    .increment(1);
}
