//! Firestore and live-query metrics.

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

pub mod names {
    /// Total Firestore requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "firestore_requests_total";

    /// Total retry attempts by operation.
    pub const RETRIES_TOTAL: &str = "firestore_retries_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "firestore_latency_seconds";

    /// Snapshots delivered to live-query listeners, by collection.
    pub const SNAPSHOTS_PUSHED_TOTAL: &str = "livecast_snapshots_pushed_total";

    /// Live queries that ended with an error, by collection.
    pub const LISTEN_ERRORS_TOTAL: &str = "livecast_listen_errors_total";

    /// Signups written.
    pub const SIGNUPS_TOTAL: &str = "livecast_signups_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record metrics for a completed Firestore request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

pub fn record_retry(operation: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}

pub fn record_snapshot(collection: &str, size: usize) {
    counter!(
        names::SNAPSHOTS_PUSHED_TOTAL,
        "collection" => collection.to_string()
    )
    .increment(1);
    histogram!("livecast_snapshot_size", "collection" => collection.to_string()).record(size as f64);
}

pub fn record_listen_error(collection: &str) {
    counter!(
        names::LISTEN_ERRORS_TOTAL,
        "collection" => collection.to_string()
    )
    .increment(1);
}

pub fn record_signup() {
    counter!(names::SIGNUPS_TOTAL).increment(1);
}
