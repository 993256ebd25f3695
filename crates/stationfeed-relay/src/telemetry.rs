//! Logging and metrics setup

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Upstream messages by kind (`status` or `fallback`)
pub const MESSAGES_TOTAL: &str = "stationfeed_messages_total";
/// Per-viewer delivery attempts by outcome
pub const DELIVERIES_TOTAL: &str = "stationfeed_deliveries_total";
/// Upstream (re)connection attempts that failed
pub const UPSTREAM_RECONNECTS_TOTAL: &str = "stationfeed_upstream_reconnects_total";
/// Currently registered viewers
pub const VIEWERS: &str = "stationfeed_viewers";

/// Initialize tracing/logging
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("stationfeed_relay=debug,stationfeed_core=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("stationfeed_relay=info,tower_http=warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Install the Prometheus recorder and return handle for rendering
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(MESSAGES_TOTAL, "Upstream messages received by kind");
    metrics::describe_counter!(
        DELIVERIES_TOTAL,
        "Viewer delivery attempts by outcome (delivered, skipped, failed)"
    );
    metrics::describe_counter!(
        UPSTREAM_RECONNECTS_TOTAL,
        "Failed upstream connection attempts"
    );
    metrics::describe_gauge!(VIEWERS, "Currently connected viewers");

    info!("Metrics exporter initialized");
    Ok(handle)
}
