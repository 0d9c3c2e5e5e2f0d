use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::core::config::Settings;

/// Installs the global Prometheus recorder and its scrape endpoint.
///
/// Without it the `metrics` macros used by the listener are no-ops.
pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let addr = settings.telemetry().prometheus_addr;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("Failed to start Prometheus exporter on {addr}"))?;

    metrics::describe_counter!(
        "queue_messages_total",
        "Queue messages handled, labelled by queue and outcome"
    );
    metrics::describe_counter!("queue_poll_errors_total", "Failed long-poll receive calls");
    metrics::describe_histogram!("queue_batch_size", "Messages returned per receive call");
    metrics::describe_counter!("heartbeat_check_ins_total", "Heartbeat check-ins by status");
    metrics::describe_counter!("listener_errors_total", "Errors reported, labelled by stage");

    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}
