//! Prometheus metrics bootstrap.

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and describe the service's metrics.
/// Returns the handle the `/metrics` endpoint renders from.
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus metrics recorder");

    describe_counter!(
        "http_requests_total",
        "Total number of HTTP requests handled"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "authz_denials_total",
        "Authorization checks that resulted in deny"
    );
    describe_counter!(
        "authz_lookup_failures_total",
        "Permission lookups that failed at the storage layer (denied)"
    );
    describe_counter!(
        "security_audit_write_failures_total",
        "Security audit events that could not be persisted"
    );

    handle
}
