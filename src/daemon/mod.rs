mod app;
mod polling;

use crate::core::settings::Settings;
use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast::error::RecvError;

pub use app::App;
use polling::RefreshOutcome;

/// Runs until Ctrl-C. SIGHUP forces an immediate refresh.
pub async fn run(settings: Settings) -> Result<()> {
    tracing::info!("Starting emby-stats daemon");

    let app = App::setup(&settings, true).await?;
    log_sensors(&app).await;

    let mut outcomes = app
        .polling()
        .context("Polling loop was not started")?
        .subscribe();
    let mut hangup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested");
                break Ok(());
            }
            _ = hangup.recv() => {
                if let Some(polling) = app.polling() {
                    polling.trigger_refresh();
                }
            }
            outcome = outcomes.recv() => match outcome {
                Ok(RefreshOutcome::Updated(_)) => log_sensors(&app).await,
                Ok(RefreshOutcome::Failed(error)) => {
                    tracing::debug!(%error, "Keeping previous sensor values");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Missed refresh notifications");
                }
                Err(RecvError::Closed) => {
                    tracing::error!("Polling loop exited, no further refreshes");
                    break Err(anyhow::anyhow!("Polling loop exited unexpectedly"));
                }
            },
        }
    };

    app.teardown().await;
    result
}

async fn log_sensors(app: &App) {
    for state in app.read_all().await {
        tracing::info!(
            sensor = %state.object_id,
            state = %state.state,
            unit = state.unit.unwrap_or(""),
            "Sensor value"
        );
    }
}
