//! Prometheus metric series for instrumented client calls.
//!
//! One counter and one duration histogram per call, labeled by library
//! type, operation, resolved table and target identity. The series live
//! in a crate-owned registry so the application can expose them from its
//! own `/metrics` handler without inheriting the default registry's
//! contents.

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

/// Library type label value for SQL drivers.
pub const LIBRARY_TYPE_SQL: &str = "sql";

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Total number of instrumented client calls.
pub static CLIENT_HANDLE_COUNTER: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "sql_client_handle_total",
            "The total number of instrumented client calls",
        ),
        &["type", "method", "table", "target"],
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Duration of instrumented client calls in seconds.
pub static CLIENT_HANDLE_HISTOGRAM: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "sql_client_handle_seconds",
            "The duration of instrumented client calls",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["type", "method", "table", "target"],
    )
    .unwrap();
    REGISTRY.register(Box::new(histogram.clone())).unwrap();
    histogram
});

/// The registry holding this crate's metric series.
pub fn registry() -> &'static Registry {
    // Touch the series so they are registered before the first gather.
    Lazy::force(&CLIENT_HANDLE_COUNTER);
    Lazy::force(&CLIENT_HANDLE_HISTOGRAM);
    &REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_and_histogram_share_labels() {
        let labels = &[LIBRARY_TYPE_SQL, "SELECT", "users", "testdb.localhost:3306"];
        CLIENT_HANDLE_COUNTER.with_label_values(labels).inc();
        CLIENT_HANDLE_HISTOGRAM
            .with_label_values(labels)
            .observe(0.002);

        assert!(CLIENT_HANDLE_COUNTER.with_label_values(labels).get() >= 1);
    }

    #[test]
    fn test_registry_gathers_series() {
        let labels = &[LIBRARY_TYPE_SQL, "INSERT", "t_gather", "db.host:1"];
        CLIENT_HANDLE_COUNTER.with_label_values(labels).inc();

        let families = registry().gather();
        let names: Vec<&str> = families.iter().map(|f| f.get_name()).collect();
        assert!(names.contains(&"sql_client_handle_total"));
    }
}
