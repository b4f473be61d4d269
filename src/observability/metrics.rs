//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_auth_attempts_total` (counter): attempts by scheme and outcome
//! - `gate_login_delay_seconds` (histogram): delay paid by failed logins
//! - `gate_blocked_addresses` (gauge): addresses with pending failures
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Recording is a no-op until an exporter is installed

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_auth_attempt(scheme: &'static str, outcome: &'static str) {
    metrics::counter!("gate_auth_attempts_total", "scheme" => scheme, "outcome" => outcome)
        .increment(1);
}

pub fn record_login_delay(delay: Duration) {
    metrics::histogram!("gate_login_delay_seconds").record(delay.as_secs_f64());
}

pub fn record_blocked_addresses(count: usize) {
    metrics::gauge!("gate_blocked_addresses").set(count as f64);
}
