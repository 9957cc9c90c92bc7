//! Prometheus counters for log traffic

use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, IntCounterVec};

static BATCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "event_log_batches_total",
        "Consumed batches by outcome (committed/failed)",
        &["topic", "outcome"]
    )
    .expect("Prometheus metrics registration should succeed at startup")
});

static RECORDS_DROPPED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "event_log_records_dropped_total",
        "Consumed records dropped because they could not be decoded",
        &["topic"]
    )
    .expect("Prometheus metrics registration should succeed at startup")
});

static PUBLISHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "event_log_published_total",
        "Published records by outcome (ok/error)",
        &["topic", "outcome"]
    )
    .expect("Prometheus metrics registration should succeed at startup")
});

pub fn record_batch(topic: &str, committed: bool) {
    let outcome = if committed { "committed" } else { "failed" };
    BATCHES_TOTAL.with_label_values(&[topic, outcome]).inc();
}

/// Called by handlers for every record they skip.
pub fn record_dropped(topic: &str) {
    RECORDS_DROPPED_TOTAL.with_label_values(&[topic]).inc();
}

pub fn record_published(topic: &str, count: usize, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    PUBLISHED_TOTAL
        .with_label_values(&[topic, outcome])
        .inc_by(count as u64);
}
