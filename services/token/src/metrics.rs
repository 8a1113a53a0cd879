//! Prometheus metrics for bearer token issuance and rotation.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

/// Tokens issued, by type (`access` or `refresh`).
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bearer_token_tokens_issued_total",
        "Total number of tokens issued",
        &["token_type"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Renewal attempts by outcome.
pub static TOKENS_RENEWED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bearer_token_tokens_renewed_total",
        "Total number of token pair renewals",
        &["status"]
    )
    .expect("Failed to register tokens_renewed metric")
});

/// Lineages revoked, by reason.
pub static LINEAGES_REVOKED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bearer_token_lineages_revoked_total",
        "Total number of refresh token lineages revoked",
        &["reason"]
    )
    .expect("Failed to register lineages_revoked metric")
});

/// Security events such as refresh token reuse.
pub static SECURITY_EVENTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bearer_token_security_events_total",
        "Total number of security events",
        &["event_type"]
    )
    .expect("Failed to register security_events metric")
});

/// Token store calls by operation and outcome (`ok`, `error`, `timeout`).
pub static STORE_OPERATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bearer_token_store_operations_total",
        "Total number of token store operations",
        &["operation", "status"]
    )
    .expect("Failed to register store_operations metric")
});

/// Latency of lineage store calls in seconds.
pub static STORE_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "bearer_token_store_latency_seconds",
        "Token store operation latency in seconds",
        &["operation"],
        vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register store_latency metric")
});

/// `token_type` is `access` or `refresh`.
pub fn record_token_issued(token_type: &str) {
    TOKENS_ISSUED.with_label_values(&[token_type]).inc();
}

/// `status` is `success` or an error code.
pub fn record_token_renewed(status: &str) {
    TOKENS_RENEWED.with_label_values(&[status]).inc();
}

/// `reason` is the error code that caused the revocation, or `sign_out`.
pub fn record_lineage_revoked(reason: &str) {
    LINEAGES_REVOKED.with_label_values(&[reason]).inc();
}

/// Count a security event by type.
pub fn record_security_event(event_type: &str) {
    SECURITY_EVENTS.with_label_values(&[event_type]).inc();
}

/// `status` is `ok`, `error` or `timeout`.
pub fn record_store_operation(operation: &str, status: &str) {
    STORE_OPERATIONS
        .with_label_values(&[operation, status])
        .inc();
}

/// Observe one store call.
pub fn record_store_latency(operation: &str, duration_secs: f64) {
    STORE_LATENCY
        .with_label_values(&[operation])
        .observe(duration_secs);
}
