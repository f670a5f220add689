use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};

/// Metric name prefix for all staleguard metrics
const PREFIX: &str = "staleguard";

/// Subsystem labels for [`record_error`].
pub const PKG_CONFIG: &str = "config";
pub const PKG_LASTUPDATE: &str = "lastupdate";
pub const PKG_ISSUERAISER: &str = "issueraiser";

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    CounterVec::new(
        Opts::new(
            format!("{PREFIX}_errors_total"),
            "The number of errors encountered, by package",
        ),
        &["package"],
    )
    .expect("Failed to create errors_total metric")
});

pub static LASTUPDATE_PAGES_TOTAL: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new(
            format!("{PREFIX}_lastupdate_pages_total"),
            "The number of pages monitored by lastupdate jobs",
        ),
        &["job_name"],
    )
    .expect("Failed to create lastupdate_pages_total metric")
});

pub static ISSUES_CREATED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    CounterVec::new(
        Opts::new(
            format!("{PREFIX}_issues_created_total"),
            "The number of issues raised for stale pages",
        ),
        &["job_name"],
    )
    .expect("Failed to create issues_created_total metric")
});

pub static AMBIGUOUS_MATCHES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    CounterVec::new(
        Opts::new(
            format!("{PREFIX}_ambiguous_matches_total"),
            "Dedup searches that matched more than one existing issue",
        ),
        &["job_name"],
    )
    .expect("Failed to create ambiguous_matches_total metric")
});

/// Register all metrics. Safe to call more than once.
pub fn init_metrics() {
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(LASTUPDATE_PAGES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ISSUES_CREATED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(AMBIGUOUS_MATCHES_TOTAL.clone()));

    tracing::debug!("metrics registered");
}

pub fn record_error(package: &str) {
    ERRORS_TOTAL.with_label_values(&[package]).inc();
}

pub fn set_pages_in_scope(job_name: &str, count: usize) {
    LASTUPDATE_PAGES_TOTAL
        .with_label_values(&[job_name])
        .set(count as f64);
}

pub fn record_issue_created(job_name: &str) {
    ISSUES_CREATED_TOTAL.with_label_values(&[job_name]).inc();
}

pub fn record_ambiguous_match(job_name: &str) {
    AMBIGUOUS_MATCHES_TOTAL.with_label_values(&[job_name]).inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
