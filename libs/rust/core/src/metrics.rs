//! Prometheus metric groups shared by the data services.
//!
//! Registered lazily in the default registry; `init_metrics` forces
//! registration so series show up at zero before the first request.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec, IntCounter, IntCounterVec,
};

pub struct ApiMetrics {
    pub requests_total: IntCounterVec,
    pub request_latency_ms: HistogramVec,
    pub upstream_failures_total: IntCounterVec,
}

pub struct MonitorMetrics {
    pub notifications_total: IntCounterVec,
    pub manifests_written_total: IntCounter,
}

const LATENCY_BUCKETS_MS: &[f64] = &[1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0];

// Metric names and label sets are static; registration only fails on a duplicate name.
pub static API_METRICS: Lazy<ApiMetrics> = Lazy::new(|| ApiMetrics {
    requests_total: register_int_counter_vec!("mlops_data_api_requests_total", "Data API requests by route and status", &["route", "status"])
        .expect("register mlops_data_api_requests_total"),
    request_latency_ms: register_histogram_vec!("mlops_data_api_request_latency_ms", "Data API request latency (ms)", &["route"], LATENCY_BUCKETS_MS.to_vec())
        .expect("register mlops_data_api_request_latency_ms"),
    upstream_failures_total: register_int_counter_vec!("mlops_upstream_failures_total", "Failed calls to managed services", &["service"])
        .expect("register mlops_upstream_failures_total"),
});

pub static MONITOR_METRICS: Lazy<MonitorMetrics> = Lazy::new(|| MonitorMetrics {
    notifications_total: register_int_counter_vec!("mlops_monitor_notifications_total", "SNS deliveries by message type", &["type"])
        .expect("register mlops_monitor_notifications_total"),
    manifests_written_total: register_int_counter!("mlops_monitor_manifests_written_total", "Data manifests uploaded")
        .expect("register mlops_monitor_manifests_written_total"),
});

pub fn init_metrics() {
    Lazy::force(&API_METRICS);
    Lazy::force(&MONITOR_METRICS);
}

/// Count a failed call to a managed service (`sagemaker`, `dynamodb`, `s3`).
pub fn record_upstream_failure(service: &str) {
    API_METRICS.upstream_failures_total.with_label_values(&[service]).inc();
}

/// Render the default registry in the Prometheus text exposition format.
pub fn render() -> Result<Vec<u8>, prometheus::Error> {
    use prometheus::{Encoder, TextEncoder};
    let mut buf = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
    Ok(buf)
}
