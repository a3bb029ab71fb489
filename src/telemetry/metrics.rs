//! Prometheus metrics setup and metric definitions

use anyhow::Context;
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub const DOMAIN_OPERATIONS: &str = "warden_domain_operations_total";
pub const DOMAIN_CASCADE_DELETED: &str = "warden_domain_cascade_deleted_total";
pub const GRANT_OPERATIONS: &str = "warden_grant_operations_total";
pub const AUTHORIZATION_CODE_REJECTED: &str = "warden_authorization_code_rejected_total";
pub const GRANTS_PURGED: &str = "warden_grants_purged_total";

/// Install the Prometheus recorder with its own scrape listener.
pub fn install_prometheus_exporter(addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("Invalid METRICS_ADDR: {}", addr))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")
}

/// Register metric descriptions and emit initial zero values so Prometheus output
/// includes HELP/TYPE lines from startup.
pub fn describe_metrics() {
    describe_counter!(
        DOMAIN_OPERATIONS,
        "Domain lifecycle operations by operation and outcome"
    );
    describe_counter!(
        DOMAIN_CASCADE_DELETED,
        "Dependent resources removed by domain deletion"
    );
    describe_counter!(GRANT_OPERATIONS, "Grant store operations by grant and operation");
    describe_counter!(
        AUTHORIZATION_CODE_REJECTED,
        "Authorization code consumptions rejected as absent, expired or replayed"
    );
    describe_counter!(GRANTS_PURGED, "Expired grants removed by the reaper");

    counter!(DOMAIN_OPERATIONS, "operation" => "delete", "outcome" => "success").absolute(0);
    counter!(AUTHORIZATION_CODE_REJECTED).absolute(0);
    for grant in ["access_token", "refresh_token", "authorization_code"] {
        counter!(GRANTS_PURGED, "grant" => grant).absolute(0);
    }
}

/// Count one domain operation
pub fn record_domain_operation(operation: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(DOMAIN_OPERATIONS, "operation" => operation, "outcome" => outcome).increment(1);
}

/// Count one grant store operation
pub fn record_grant_operation(grant: &'static str, operation: &'static str) {
    counter!(GRANT_OPERATIONS, "grant" => grant, "operation" => operation).increment(1);
}
