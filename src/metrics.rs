// src/metrics.rs

#[cfg(feature = "observability")]
pub use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

// NOTE: When observability feature is disabled, provide stub implementations
#[cfg(not(feature = "observability"))]
pub enum Unit {
    Milliseconds,
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! counter {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {{
        let _ = ($name, $value $(, $label, $label_value)*);
    }};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! histogram {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {{
        let _ = ($name, $value $(, $label, $label_value)*);
    }};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_counter {
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_histogram {
    ($name:expr, $unit:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
use crate::{counter, describe_counter, describe_histogram, histogram};

use std::time::Duration;

/// Initializes the descriptions for all the metrics in the SDK.
/// This should be called once at startup.
pub fn describe_metrics() {
    describe_counter!("cache_hits_total", "Reads served from a read-coordination cache.");
    describe_counter!("cache_miss_total", "Reads that had to go to the ledger.");
    describe_counter!(
        "cache_inflight_skips_total",
        "Reads skipped because the same key was already in flight."
    );
    describe_counter!("ledger_calls_total", "View-function calls issued to the ledger.");
    describe_counter!("ledger_call_errors_total", "View-function calls that failed.");
    describe_histogram!(
        "ledger_call_latency_ms",
        Unit::Milliseconds,
        "Latency of view-function calls."
    );
}

pub fn increment_cache_hit(cache_name: &str) {
    counter!("cache_hits_total", 1, "cache" => cache_name.to_string());
}

pub fn increment_cache_miss(cache_name: &str) {
    counter!("cache_miss_total", 1, "cache" => cache_name.to_string());
}

pub fn increment_inflight_skip(cache_name: &str) {
    counter!("cache_inflight_skips_total", 1, "cache" => cache_name.to_string());
}

pub fn increment_remote_call(component: &str, method: &str) {
    counter!("ledger_calls_total", 1,
             "component" => component.to_string(),
             "method" => method.to_string());
}

pub fn increment_remote_error(component: &str, method: &str) {
    counter!("ledger_call_errors_total", 1,
             "component" => component.to_string(),
             "method" => method.to_string());
}

pub fn record_remote_latency(component: &str, method: &str, duration: Duration) {
    histogram!("ledger_call_latency_ms", duration.as_millis() as f64,
               "component" => component.to_string(),
               "method" => method.to_string());
}
