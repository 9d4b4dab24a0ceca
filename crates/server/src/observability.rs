use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static OBJECTS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "reservation_objects_created_total",
        "Total objects created"
    )
    .expect("register objects_created_total")
});

pub static TRANSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "reservation_transitions_total",
        "Reserve/unreserve calls by outcome",
        &["op", "outcome"]
    )
    .expect("register transitions_total")
});

pub static LISTING_SKIPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "reservation_listing_skipped_total",
        "Records skipped during listings because they could not be read or decoded"
    )
    .expect("register listing_skipped_total")
});

pub static STORE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "reservation_store_failures_total",
        "Requests that failed because the entity store was unavailable"
    )
    .expect("register store_failures_total")
});

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
