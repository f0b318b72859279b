//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_requests_total` (counter): dispatch outcomes by `outcome`
//!   (`matched`, `redirect`, `options`, `not_found`, `method_not_allowed`,
//!   `panic`)
//! - `router_endpoint_hits_total` (counter): hits by `method`, `path` pattern
//!
//! # Design Decisions
//! - Recorders are no-ops until `init_metrics` installs the exporter
//! - Paths are labelled by pattern, never by raw request path

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Dispatch outcome label values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Matched,
    Redirect,
    Options,
    NotFound,
    MethodNotAllowed,
    Panic,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Matched => "matched",
            Outcome::Redirect => "redirect",
            Outcome::Options => "options",
            Outcome::NotFound => "not_found",
            Outcome::MethodNotAllowed => "method_not_allowed",
            Outcome::Panic => "panic",
        }
    }
}

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_outcome(outcome: Outcome) {
    metrics::counter!("router_requests_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn record_hit(method: &str, path: &str) {
    metrics::counter!(
        "router_endpoint_hits_total",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .increment(1);
}
