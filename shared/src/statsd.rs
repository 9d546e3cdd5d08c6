use metrics_exporter_statsd::{StatsdBuilder, StatsdError};

#[derive(thiserror::Error, Debug)]
pub enum MetricsInstallError {
    #[error("could not build statsd exporter: {0}")]
    Statsd(#[from] StatsdError),
    #[error("a global metrics recorder is already installed")]
    AlreadyInstalled,
}

/// Install a statsd recorder as the process-wide `metrics` sink. Call once
/// at startup, before any component emits a metric.
pub fn install(host: &str, port: u16, prefix: &str) -> Result<(), MetricsInstallError> {
    let recorder = StatsdBuilder::from(host, port).build(Some(prefix))?;
    metrics::set_global_recorder(recorder).map_err(|_| MetricsInstallError::AlreadyInstalled)?;
    tracing::info!("statsd metrics exporter installed ({host}:{port})");
    Ok(())
}
