//! Drowsiness Detection Service - Main Entry Point
//!
//! Usage: `drowsiness-server [settings-file]`

use anyhow::Context;
use api::{init_logging, run_server, ServerSettings};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1);
    let settings = ServerSettings::load(path.as_deref()).context("loading settings")?;
    init_logging(&settings.log);

    info!("=== Drowsiness Detection Service v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "EAR threshold {} over {} consecutive frames",
        settings.dms.ear_threshold, settings.dms.consecutive_frames
    );

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;

    run_server(settings, Some(metrics)).await
}
