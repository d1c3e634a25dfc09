/// Prometheus metrics for guarded calls
#[cfg(feature = "metrics")]
use prometheus::{register_int_counter_vec, IntCounterVec};

#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;

#[cfg(feature = "metrics")]
static REQUEST_OUTCOMES: Lazy<Option<IntCounterVec>> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_client_request_outcomes_total",
        "Total number of guarded collaborator calls by preset and outcome",
        &["preset", "outcome"]
    )
    .ok()
});

/// Metrics collector for guarded calls
#[cfg(feature = "metrics")]
pub struct RequestMetrics;

#[cfg(feature = "metrics")]
impl RequestMetrics {
    pub fn record_outcome(preset: &str, outcome: &str) {
        if let Some(counter) = REQUEST_OUTCOMES.as_ref() {
            counter.with_label_values(&[preset, outcome]).inc();
        }
    }
}

// No-op implementation when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub struct RequestMetrics;

#[cfg(not(feature = "metrics"))]
impl RequestMetrics {
    pub fn record_outcome(_preset: &str, _outcome: &str) {}
}
