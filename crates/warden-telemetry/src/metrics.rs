//! Prometheus metrics.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `warden_requests_total` | Counter | `route`, `status` | Completed requests |
//! | `warden_request_duration_seconds` | Histogram | `route` | Request latency |
//! | `warden_in_flight_requests` | Gauge | - | Requests being processed |
//! | `warden_auth_failures_total` | Counter | `stage` | 401/403 outcomes |
//! | `warden_panics_total` | Counter | - | Handler panics caught |
//! | `warden_shutdown_triggers_total` | Counter | `source` | Shutdown requests |
//!
//! Recording functions are no-ops until a recorder is installed.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

/// Metric names.
pub mod names {
    /// Completed requests.
    pub const REQUESTS_TOTAL: &str = "warden_requests_total";
    /// Request latency.
    pub const REQUEST_DURATION: &str = "warden_request_duration_seconds";
    /// Requests being processed.
    pub const IN_FLIGHT: &str = "warden_in_flight_requests";
    /// Authentication and authorization rejections.
    pub const AUTH_FAILURES: &str = "warden_auth_failures_total";
    /// Panics caught by the panic guard.
    pub const PANICS: &str = "warden_panics_total";
    /// Shutdown requests by source.
    pub const SHUTDOWN_TRIGGERS: &str = "warden_shutdown_triggers_total";
}

/// Latency buckets: 1ms to 10s.
pub const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address the Prometheus scrape endpoint listens on.
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Installs the global Prometheus recorder and its scrape listener.
///
/// Must run inside a Tokio runtime so the listener is spawned onto it.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for an unparseable address and
/// `TelemetryError::MetricsInit` if the recorder cannot be installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(Matcher::Full(names::REQUEST_DURATION.to_string()), DURATION_BUCKETS)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .install()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    describe_metrics();
    Ok(())
}

/// Registers help text for the standard metrics.
pub fn describe_metrics() {
    describe_counter!(names::REQUESTS_TOTAL, "Total number of HTTP requests completed");
    describe_histogram!(names::REQUEST_DURATION, "HTTP request duration in seconds");
    describe_gauge!(names::IN_FLIGHT, "Number of HTTP requests currently being processed");
    describe_counter!(names::AUTH_FAILURES, "Requests rejected with 401 or 403");
    describe_counter!(names::PANICS, "Handler panics converted to 500 responses");
    describe_counter!(names::SHUTDOWN_TRIGGERS, "Shutdown requests by source");
}

/// Records a completed request.
pub fn record_request(route: &str, status_code: u16, duration: Duration) {
    counter!(
        names::REQUESTS_TOTAL,
        "route" => route.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(names::REQUEST_DURATION, "route" => route.to_string())
        .record(duration.as_secs_f64());
}

/// Records a rejection by the named stage (`authenticate` or `authorize`).
pub fn record_auth_failure(stage: &'static str) {
    counter!(names::AUTH_FAILURES, "stage" => stage).increment(1);
}

/// Records a caught panic.
pub fn record_panic() {
    counter!(names::PANICS).increment(1);
}

/// Records a shutdown request (`signal` or `in_band`).
pub fn record_shutdown_trigger(source: &'static str) {
    counter!(names::SHUTDOWN_TRIGGERS, "source" => source).increment(1);
}

/// Holds the in-flight gauge up for its lifetime.
///
/// Dropping the guard decrements the gauge, including during unwinding.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(names::IN_FLIGHT).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(names::IN_FLIGHT).decrement(1.0);
    }
}
