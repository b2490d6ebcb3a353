use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::TelemetryConfig;

/// Initialize structured logging.
///
/// `RUST_LOG` selects levels (default `info`); `json_logs` switches the
/// output to one JSON object per line.
pub fn init(config: &TelemetryConfig) {
    let filter_layer = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,agency_site=debug"));

    let registry = tracing_subscriber::registry().with(filter_layer);

    if config.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_target(true),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .compact(),
            )
            .init();
    }
}

/// Install the global Prometheus recorder.
///
/// Returns `None` when metrics are disabled. Counters recorded before
/// installation, or with metrics disabled, are dropped.
pub fn install_metrics(config: &TelemetryConfig) -> anyhow::Result<Option<PrometheusHandle>> {
    if !config.metrics_enabled {
        return Ok(None);
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(Some(handle))
}

fn describe_metrics() {
    metrics::describe_counter!("chat_messages_total", "Visitor messages accepted by the widget");
    metrics::describe_counter!(
        "chat_replies_total",
        "Chat replies revealed, by outcome (ok or fallback)"
    );
    metrics::describe_counter!("quiz_submissions_total", "Completed quiz submissions");
}
