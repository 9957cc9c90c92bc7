//! Prometheus metrics for the HTTP surface

use actix_web::{get, HttpResponse};
use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

static MESSAGES_ENQUEUED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "messaging_api_messages_enqueued_total",
        "Create-message requests by outcome (ok/error)",
        &["outcome"]
    )
    .expect("Prometheus metrics registration should succeed at startup")
});

static PAGES_SERVED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "messaging_api_pages_served_total",
        "Message pages served by source (store/search)",
        &["source"]
    )
    .expect("Prometheus metrics registration should succeed at startup")
});

pub fn record_enqueue(ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    MESSAGES_ENQUEUED_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_page(source: &str) {
    PAGES_SERVED_TOTAL.with_label_values(&[source]).inc();
}

#[get("/metrics")]
pub async fn metrics_handler() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %err, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
