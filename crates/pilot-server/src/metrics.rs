//! Prometheus recorder and signaling metric helpers.

use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Signaling requests received (counter, labels: method).
pub const SIGNAL_REQUESTS_TOTAL: &str = "signal_requests_total";
/// Signaling notifications received (counter, labels: method).
pub const SIGNAL_NOTIFICATIONS_TOTAL: &str = "signal_notifications_total";
/// Request handler latency (histogram, labels: method).
pub const SIGNAL_REQUEST_DURATION_SECONDS: &str = "signal_request_duration_seconds";
/// Requests answered with an error (counter, labels: code).
pub const SIGNAL_ERRORS_TOTAL: &str = "signal_errors_total";
/// WebSocket connections accepted (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// Open WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";

/// Install the global Prometheus recorder. Call once, before traffic.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Count one inbound request. Unregistered methods share one label value.
pub fn record_request(method: &str, known: bool) {
    let label = if known { method.to_owned() } else { "unknown".to_owned() };
    counter!(SIGNAL_REQUESTS_TOTAL, "method" => label).increment(1);
}

/// Count one inbound notification.
pub fn record_notification(method: &str, known: bool) {
    let label = if known { method.to_owned() } else { "unknown".to_owned() };
    counter!(SIGNAL_NOTIFICATIONS_TOTAL, "method" => label).increment(1);
}

/// Record how long a registered request handler ran.
pub fn record_request_duration(method: &str, elapsed: Duration) {
    histogram!(SIGNAL_REQUEST_DURATION_SECONDS, "method" => method.to_owned())
        .record(elapsed.as_secs_f64());
}

/// Count one error response.
pub fn record_error(code: i32) {
    counter!(SIGNAL_ERRORS_TOTAL, "code" => code.to_string()).increment(1);
}

/// A connection was accepted.
pub fn connection_opened() {
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
}

/// A connection ended.
pub fn connection_closed() {
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
}
