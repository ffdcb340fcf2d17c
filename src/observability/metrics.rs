//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bodyrest_dispatch_total` (counter): dispatches by outcome
//!   (`ok` or the failing error kind)
//! - `bodyrest_dispatch_duration_seconds` (histogram): bind + invoke + serve time
//!
//! # Design Decisions
//! - Outcome labels are a closed set of static strings

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one finished dispatch.
pub fn record_dispatch(outcome: &'static str, start: Instant) {
    ::metrics::counter!("bodyrest_dispatch_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("bodyrest_dispatch_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}
