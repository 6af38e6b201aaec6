//! Prometheus metrics for media-service.
//!
//! Page-loader collectors and an HTTP handler for the `/metrics` endpoint.
//! Query cache counters live in `flourish-cache` and are registered with the
//! default registry at startup.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

lazy_static! {
    /// Page loads segmented by where the content came from (cache, remote).
    pub static ref PAGE_LOADS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "media_page_loads_total",
        "Media page loads segmented by content source",
        &["source"]
    )
    .expect("failed to register media_page_loads_total");

    /// Remote store calls by query (content, likes, follows) and outcome.
    pub static ref REMOTE_FETCHES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "media_remote_fetches_total",
        "Remote store queries segmented by query and outcome",
        &["query", "outcome"]
    )
    .expect("failed to register media_remote_fetches_total");

    /// Interaction cache invalidations triggered by change notifications.
    pub static ref CHANGE_INVALIDATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "media_change_invalidations_total",
        "Change notifications handled segmented by table",
        &["table"]
    )
    .expect("failed to register media_change_invalidations_total");
}

pub fn record_page_load(source: &str) {
    PAGE_LOADS_TOTAL.with_label_values(&[source]).inc();
}

pub fn record_remote_fetch<T, E>(query: &str, result: &Result<T, E>) {
    let outcome = if result.is_ok() { "success" } else { "error" };
    REMOTE_FETCHES_TOTAL
        .with_label_values(&[query, outcome])
        .inc();
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
