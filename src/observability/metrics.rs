//! Metrics collection and exposition.
//!
//! # Metrics
//! - `vitals_health_state` (gauge): 0=happy, 1=warn, 2=unhappy, -1=other
//! - `vitals_transitions_total` (counter): committed transitions by code
//! - `vitals_signals_total` (counter): forwarded errors by kind
//! - `vitals_event_loop_lag_ms` (gauge): smoothed scheduler lag
//! - `vitals_probe_requests_total` (counter): probe responses by status
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Prometheus exporter runs its own listener, separate from the probe

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::health::{Code, HealthState};

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_state(state: &HealthState) {
    metrics::gauge!("vitals_health_state").set(state.gauge_value());
}

pub fn record_transition(code: &Code) {
    metrics::counter!("vitals_transitions_total", "code" => code.to_string()).increment(1);
}

pub fn record_signal(kind: &'static str) {
    metrics::counter!("vitals_signals_total", "kind" => kind).increment(1);
}

pub fn record_event_loop_lag(lag_ms: f64) {
    metrics::gauge!("vitals_event_loop_lag_ms").set(lag_ms);
}

pub fn record_probe(status: u16) {
    metrics::counter!("vitals_probe_requests_total", "status" => status.to_string()).increment(1);
}
