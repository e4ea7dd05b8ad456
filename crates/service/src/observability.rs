use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram, IntCounter, IntCounterVec,
    TextEncoder,
};

// Prometheus metrics (default registry)
pub static LOGIN_ATTEMPTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("portal_login_attempts_total", "Login submissions accepted for resolution", &["role"])
        .expect("register login_attempts_total")
});

pub static LOGIN_SUCCESS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("portal_login_success_total", "Logins that produced a session", &["role"])
        .expect("register login_success_total")
});

pub static LOGIN_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("portal_login_failures_total", "Logins that failed, by reason", &["reason"])
        .expect("register login_failures_total")
});

pub static IGNORED_SUBMITS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("portal_ignored_submits_total", "Submits dropped because one was already in flight")
        .expect("register ignored_submits_total")
});

pub static ABANDONED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("portal_abandoned_resolutions_total", "Resolutions discarded after the view moved on")
        .expect("register abandoned_total")
});

pub static RETRIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("portal_collaborator_retries_total", "Retried collaborator calls")
        .expect("register retries_total")
});

pub static COLLABORATOR_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "portal_collaborator_duration_seconds",
        "Time spent waiting for the authentication collaborator",
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("register collaborator_duration")
});

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (axum::http::StatusCode::INTERNAL_SERVER_ERROR, format!("metrics encode error: {e}"));
    }
    (axum::http::StatusCode::OK, String::from_utf8(buffer).unwrap_or_default())
}
