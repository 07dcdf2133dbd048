//! Metrics collection and exposition.
//!
//! # Metrics
//! - `catcher_requests_total` (counter): processing passes started
//! - `catcher_requests_aborted_total` (counter): requests dropped without a reply
//! - `catcher_events_sent_total` (counter): events delivered, by transport
//! - `catcher_events_failed_total` (counter): events lost, by transport
//!
//! # Design Decisions
//! - Without an installed recorder every update is a no-op
//! - The Prometheus endpoint is optional and off by default

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::config::Transport;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request() {
    metrics::counter!("catcher_requests_total").increment(1);
}

pub fn record_aborted() {
    metrics::counter!("catcher_requests_aborted_total").increment(1);
}

pub fn record_event_sent(transport: Transport) {
    metrics::counter!("catcher_events_sent_total", "transport" => transport.as_str()).increment(1);
}

pub fn record_event_failed(transport: Transport) {
    metrics::counter!("catcher_events_failed_total", "transport" => transport.as_str()).increment(1);
}
