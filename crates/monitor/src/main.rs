//! Drowsiness Monitor - Main Entry Point
//!
//! Usage: `drowsiness-monitor [settings-file]`

use std::sync::Arc;
use std::time::Duration;

use alerting::{AlarmController, StatusBoard};
use anyhow::Context;
use telemetry::init_logging;
use monitor::{DetectionClient, MonitorSettings, SessionController};
use tracing::{info, warn};

const START_RETRY: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1);
    let settings = MonitorSettings::load(path.as_deref()).context("loading settings")?;
    init_logging(&settings.log);

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Detection service at {}", settings.client.endpoint);

    let camera = settings.source.build().context("opening camera source")?;
    let client = Arc::new(DetectionClient::new(&settings.client).context("building HTTP client")?);
    let board = StatusBoard::new();
    let alarm = Arc::new(AlarmController::new(
        &settings.alarm,
        settings.alarm.sink.build(),
        board.clone(),
    ));

    let mut updates = board.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let view = updates.borrow_and_update().clone();
            info!(ear = %view.ear, frames = %view.frames, "{}", view.state);
        }
    });

    let mut controller = SessionController::new(camera, client, alarm, board, settings.camera.clone());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    while let Err(e) = controller.start() {
        warn!("{}; retrying in {}s", e, START_RETRY.as_secs());
        tokio::select! {
            _ = &mut shutdown => {
                printer.abort();
                return Ok(());
            }
            _ = tokio::time::sleep(START_RETRY) => {}
        }
    }

    shutdown.await.context("waiting for Ctrl-C")?;
    info!("Shutdown requested");
    controller.stop();

    // let the final status line print
    tokio::time::sleep(Duration::from_millis(50)).await;
    printer.abort();
    Ok(())
}
