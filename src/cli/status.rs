use crate::core::settings::Settings;
use crate::core::store::RefreshState;
use crate::daemon::App;
use crate::sensors::SensorState;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct StatusOutput {
    refresh_state: RefreshState,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
    sensors: Vec<SensorState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

/// Refreshes once and prints every sensor. Poster downloads started while reading
/// the sensors are dropped when the command exits, so the cache is only filled by
/// the daemon; leftover partial files are cleaned up on the next start.
pub async fn run(settings: &Settings, json: bool) -> Result<()> {
    let app = App::setup(settings, false).await?;

    let coordinator = app.coordinator();
    let output = StatusOutput {
        refresh_state: coordinator.state().await,
        last_error: coordinator.last_error().await,
        sensors: app.read_all().await,
        updated_at: coordinator.snapshot().await.map(|s| s.updated_at),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text_output(&output);
    }

    app.teardown().await;
    Ok(())
}

fn print_text_output(output: &StatusOutput) {
    if let Some(updated_at) = output.updated_at {
        println!("Emby statistics (updated {})", updated_at.format("%Y-%m-%d %H:%M UTC"));
    }

    for state in &output.sensors {
        let value = match &state.state {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let unit = state.unit.map(|u| format!(" {}", u)).unwrap_or_default();
        println!("  {:<24} {}{}", format!("{}:", state.name), value, unit);
    }
}
