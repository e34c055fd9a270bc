//! Prometheus metrics for the polling and detection pipeline.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tracing::debug;

// === Metric Name Constants ===

/// Poll duration metric name.
pub const METRIC_POLL_DURATION: &str = "marketplace_poll_duration_ms";
/// Detection pass duration metric name.
pub const METRIC_DETECTION_DURATION: &str = "detection_pass_duration_ms";
/// Successful polls counter metric name.
pub const METRIC_POLLS_SUCCEEDED: &str = "marketplace_polls_succeeded_total";
/// Failed polls counter metric name.
pub const METRIC_POLLS_FAILED: &str = "marketplace_polls_failed_total";
/// Price records upserted counter metric name.
pub const METRIC_RECORDS_UPSERTED: &str = "price_records_upserted_total";
/// Stale writes discarded counter metric name.
pub const METRIC_STALE_WRITES_DISCARDED: &str = "stale_writes_discarded_total";
/// Duplicate writes ignored counter metric name.
pub const METRIC_DUPLICATE_WRITES_IGNORED: &str = "duplicate_writes_ignored_total";
/// Quarantined descriptors counter metric name.
pub const METRIC_ITEMS_QUARANTINED: &str = "descriptors_quarantined_total";
/// Opportunities detected counter metric name.
pub const METRIC_OPPORTUNITIES_DETECTED: &str = "opportunities_detected_total";
/// Alerts dispatched counter metric name.
pub const METRIC_ALERTS_DISPATCHED: &str = "alerts_dispatched_total";
/// Alerts suppressed counter metric name.
pub const METRIC_ALERTS_SUPPRESSED: &str = "alerts_suppressed_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_POLL_DURATION,
        "Marketplace poll duration in milliseconds"
    );
    describe_histogram!(
        METRIC_DETECTION_DURATION,
        "Detection pass duration in milliseconds"
    );

    describe_counter!(
        METRIC_POLLS_SUCCEEDED,
        "Total number of successful marketplace polls"
    );
    describe_counter!(
        METRIC_POLLS_FAILED,
        "Total number of failed marketplace polls"
    );
    describe_counter!(
        METRIC_RECORDS_UPSERTED,
        "Total number of price records applied to the store"
    );
    describe_counter!(
        METRIC_STALE_WRITES_DISCARDED,
        "Total number of late-arriving writes discarded by the store"
    );
    describe_counter!(
        METRIC_DUPLICATE_WRITES_IGNORED,
        "Total number of replayed writes ignored by the store"
    );
    describe_counter!(
        METRIC_ITEMS_QUARANTINED,
        "Total number of unresolvable listing descriptors quarantined"
    );
    describe_counter!(
        METRIC_OPPORTUNITIES_DETECTED,
        "Total number of arbitrage opportunities detected"
    );
    describe_counter!(
        METRIC_ALERTS_DISPATCHED,
        "Total number of opportunity alerts dispatched"
    );
    describe_counter!(
        METRIC_ALERTS_SUPPRESSED,
        "Total number of opportunity alerts suppressed by dedup"
    );

    debug!("Metrics initialized");
}

/// Record a completed poll for one marketplace.
pub fn observe_poll(marketplace: &str, elapsed: Duration, ok: bool) {
    let latency_ms = elapsed.as_secs_f64() * 1000.0;
    histogram!(METRIC_POLL_DURATION, "marketplace" => marketplace.to_string()).record(latency_ms);
    if ok {
        counter!(METRIC_POLLS_SUCCEEDED, "marketplace" => marketplace.to_string()).increment(1);
    } else {
        counter!(METRIC_POLLS_FAILED, "marketplace" => marketplace.to_string()).increment(1);
    }
}

/// Record a completed detection pass.
pub fn observe_detection_pass(elapsed: Duration, opportunities: usize) {
    let latency_ms = elapsed.as_secs_f64() * 1000.0;
    histogram!(METRIC_DETECTION_DURATION).record(latency_ms);
    counter!(METRIC_OPPORTUNITIES_DETECTED).increment(opportunities as u64);
}

/// Increment the applied-records counter.
pub fn inc_records_upserted() {
    counter!(METRIC_RECORDS_UPSERTED).increment(1);
}

/// Increment the stale-writes-discarded counter.
pub fn inc_stale_writes_discarded() {
    counter!(METRIC_STALE_WRITES_DISCARDED).increment(1);
}

/// Increment the duplicate-writes-ignored counter.
pub fn inc_duplicate_writes_ignored() {
    counter!(METRIC_DUPLICATE_WRITES_IGNORED).increment(1);
}

/// Increment the quarantined-descriptors counter.
pub fn inc_items_quarantined() {
    counter!(METRIC_ITEMS_QUARANTINED).increment(1);
}

/// Increment the alerts-dispatched counter.
pub fn inc_alerts_dispatched() {
    counter!(METRIC_ALERTS_DISPATCHED).increment(1);
}

/// Increment the alerts-suppressed counter.
pub fn inc_alerts_suppressed() {
    counter!(METRIC_ALERTS_SUPPRESSED).increment(1);
}
