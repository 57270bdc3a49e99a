//! Prometheus metrics for the tournament server.
//!
//! Recording is always safe: without an installed exporter the `metrics`
//! macros are no-ops.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use tourney_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/tournaments/{id}/rounds", 201);
//! metrics::round_generated(8);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Realtime Metrics
// ============================================================================

/// A realtime connection opened.
pub fn websocket_connected() {
    metrics::counter!("websocket_connections_total").increment(1);
    metrics::gauge!("websocket_connections_active").increment(1.0);
}

/// A realtime connection closed.
pub fn websocket_disconnected() {
    metrics::gauge!("websocket_connections_active").decrement(1.0);
}

/// Increment events pushed to realtime clients.
pub fn websocket_events_sent(topic: &str) {
    metrics::counter!("websocket_events_sent", "topic" => topic.to_string()).increment(1);
}

// ============================================================================
// Competition Metrics
// ============================================================================

/// A round was paired with `matches` new matches.
pub fn round_generated(matches: usize) {
    metrics::counter!("rounds_generated_total").increment(1);
    metrics::counter!("matches_paired_total").increment(matches as u64);
}

/// A score submission finished with `outcome` (`accepted` or an error kind).
pub fn score_submitted(outcome: &str) {
    metrics::counter!("scores_submitted_total", "outcome" => outcome.to_string()).increment(1);
}

/// Prize payouts were recorded.
pub fn payouts_recorded(count: usize, amount: i64) {
    metrics::counter!("payouts_recorded_total").increment(count as u64);
    metrics::histogram!("prize_amount_distributed").record(amount as f64);
}

/// A dispute was filed.
pub fn dispute_raised(kind: &str) {
    metrics::counter!("disputes_raised_total", "kind" => kind.to_string()).increment(1);
}

/// A direct message was delivered.
pub fn direct_message_sent() {
    metrics::counter!("direct_messages_sent_total").increment(1);
}
