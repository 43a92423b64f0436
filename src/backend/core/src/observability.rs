//! Observability: logging and metrics.
//!
//! Logging goes through `tracing` with an `EnvFilter` (RUST_LOG wins over
//! the configured level) and either a JSON or a human-readable fmt layer.
//! Metrics are recorded through the `metrics` facade into a process-global
//! Prometheus registry rendered by the `/metrics` endpoint.

use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

static PROMETHEUS: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the observability stack.
///
/// Call once at process start; a second call fails because the global
/// tracing subscriber is already set.
pub fn init(config: &ObservabilityConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    if config.json_logging {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROMETHEUS.set(handle);

    Ok(())
}

/// Rendered Prometheus exposition text, empty before [`init`] ran.
pub fn prometheus_metrics() -> String {
    PROMETHEUS.get().map(PrometheusHandle::render).unwrap_or_default()
}
