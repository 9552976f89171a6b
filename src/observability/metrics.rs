//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_requests_total` (counter): requests by route class and status
//! - `guard_verdicts_total` (counter): proxy verdicts by outcome and service
//! - `guard_tokens_issued_total` (counter)
//! - `guard_token_rejections_total` (counter): by rejection kind
//! - `guard_reputation_attempts_total` (counter): by result
//! - `guard_admin_checks_total` (counter): by result
//! - `guard_upstream_duration_seconds` (histogram)
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &'static str, status: u16) {
    counter!("guard_requests_total", "route" => route, "status" => status.to_string()).increment(1);
}

pub fn record_verdict(is_proxy: bool, service: Option<&str>) {
    let outcome = if is_proxy { "flagged" } else { "clean" };
    counter!(
        "guard_verdicts_total",
        "outcome" => outcome,
        "service" => service.unwrap_or("none").to_string()
    )
    .increment(1);
}

pub fn record_token_issued() {
    counter!("guard_tokens_issued_total").increment(1);
}

pub fn record_token_rejected(kind: &'static str) {
    counter!("guard_token_rejections_total", "reason" => kind).increment(1);
}

pub fn record_reputation_attempt(result: &'static str) {
    counter!("guard_reputation_attempts_total", "result" => result).increment(1);
}

pub fn record_admin_check(result: &'static str) {
    counter!("guard_admin_checks_total", "result" => result).increment(1);
}

pub fn record_upstream(status: u16, start: Instant) {
    histogram!("guard_upstream_duration_seconds", "status" => status.to_string())
        .record(start.elapsed().as_secs_f64());
}
