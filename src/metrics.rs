//! Sampler and cache metrics. Compiled to no-ops without `observability`.

#[cfg(feature = "observability")]
pub use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
    increment_counter, Unit,
};

#[cfg(not(feature = "observability"))]
pub enum Unit {}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! counter {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! gauge {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! histogram {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! increment_counter {
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_counter {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_gauge {
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_histogram {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[allow(unused_imports)]
use crate::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
    increment_counter,
};

/// Registers descriptions for every sampler metric. Call once at startup.
pub fn describe_metrics() {
    describe_counter!(
        "sampler_batch_calls_total",
        "Batched sampler calls sent over the transport."
    );
    describe_counter!(
        "sampler_batch_skipped_total",
        "Batches answered locally because every operation was a no-op."
    );
    describe_histogram!(
        "sampler_batch_size",
        "Number of non-empty sub-calls per batched sampler call."
    );
    describe_counter!(
        "sampler_operation_reverts_total",
        "Sampler sub-calls that reverted, labeled by source."
    );
    describe_counter!(
        "cache_refresh_total",
        "Background cache refreshes, labeled by cache and outcome."
    );
    describe_gauge!("cache_entries", "Entries in the current cache snapshot.");
    describe_counter!("cache_hits_total", "Cache lookups that found an entry.");
    describe_counter!("cache_miss_total", "Cache lookups that found nothing.");
}

pub fn record_batch_call(size: usize) {
    increment_counter!("sampler_batch_calls_total");
    histogram!("sampler_batch_size", size as f64);
}

pub fn increment_batch_skipped() {
    increment_counter!("sampler_batch_skipped_total");
}

pub fn increment_operation_revert(source: &str) {
    counter!("sampler_operation_reverts_total", 1, "source" => source.to_string());
}

pub fn record_cache_refresh(cache_name: &str, outcome: &'static str) {
    counter!(
        "cache_refresh_total",
        1,
        "cache" => cache_name.to_string(),
        "outcome" => outcome
    );
}

pub fn set_cache_entries(cache_name: &str, size: usize) {
    gauge!("cache_entries", size as f64, "cache" => cache_name.to_string());
}

pub fn increment_cache_hit(cache_name: &str) {
    counter!("cache_hits_total", 1, "cache" => cache_name.to_string());
}

pub fn increment_cache_miss(cache_name: &str) {
    counter!("cache_miss_total", 1, "cache" => cache_name.to_string());
}
