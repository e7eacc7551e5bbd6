//! Metrics definitions for the relay service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `relay_` prefix for the relay service
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `kind`: 3 values (offer, answer, ice-candidate)
//! - `status`: 3 values (completed, missed, declined)
//! Identity strings are never used as label values.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the Prometheus recorder fails to install (e.g.,
/// already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("relay_http_request".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record a stored signal.
///
/// Metric: `relay_signals_stored_total`
/// Labels: `kind`
pub fn record_signal_stored(kind: &'static str) {
    counter!("relay_signals_stored_total", "kind" => kind).increment(1);
}

/// Record a rejected signal.
///
/// Metric: `relay_signals_rejected_total`
pub fn record_signal_rejected() {
    counter!("relay_signals_rejected_total").increment(1);
}

/// Record a mailbox drain.
///
/// Metric: `relay_polls_total`, `relay_signals_delivered_total`
pub fn record_poll(delivered: usize) {
    counter!("relay_polls_total").increment(1);
    counter!("relay_signals_delivered_total").increment(delivered as u64);
}

/// Record an explicit mailbox clear.
///
/// Metric: `relay_clears_total`, `relay_signals_discarded_total`
pub fn record_clear(discarded: usize) {
    counter!("relay_clears_total").increment(1);
    counter!("relay_signals_discarded_total").increment(discarded as u64);
}

/// Record signals dropped by the stale-signal sweeper.
///
/// Metric: `relay_signals_swept_total`
pub fn record_swept(swept: usize) {
    counter!("relay_signals_swept_total").increment(swept as u64);
}

/// Update the gauge tracking undelivered signals across all mailboxes.
///
/// Metric: `relay_mailbox_depth`
pub fn update_mailbox_depth(depth: usize) {
    // Gauges take f64; depth is bounded by the sweeper well below 2^52.
    gauge!("relay_mailbox_depth").set(depth as f64);
}

/// Record an appended call history record.
///
/// Metric: `relay_call_records_total`
/// Labels: `status`
pub fn record_history_write(status: &'static str) {
    counter!("relay_call_records_total", "status" => status).increment(1);
}

/// Record HTTP request completion.
///
/// Metric: `relay_http_request_duration_seconds`
/// Labels: `endpoint`
pub fn record_http_request(endpoint: &'static str, duration: Duration) {
    histogram!("relay_http_request_duration_seconds", "endpoint" => endpoint)
        .record(duration.as_secs_f64());
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_a_no_op() {
        // The metrics facade drops records when no recorder is installed;
        // these must not panic in that configuration.
        record_signal_stored("offer");
        record_signal_rejected();
        record_poll(3);
        record_clear(0);
        record_swept(2);
        update_mailbox_depth(5);
        record_history_write("completed");
        record_http_request("/signal", Duration::from_millis(2));
    }
}
