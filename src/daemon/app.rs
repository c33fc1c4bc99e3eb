use crate::api::{EmbyClient, MediaServer};
use crate::core::coordinator::StatsCoordinator;
use crate::core::settings::Settings;
use crate::daemon::polling::PollingLoop;
use crate::sensors::{build_sensors, PosterCache, Sensor, SensorState};
use anyhow::{Context, Result};
use std::sync::Arc;

/// A configured, running integration: coordinator, sensors and (optionally) the
/// polling task.
pub struct App {
    coordinator: Arc<StatsCoordinator>,
    sensors: Vec<Sensor>,
    polling: Option<PollingLoop>,
}

impl App {
    /// Validates settings, tests the connection and performs the first refresh. Any
    /// failure aborts setup.
    pub async fn setup(settings: &Settings, start_polling: bool) -> Result<Self> {
        settings.validate()?;
        let client = EmbyClient::new(&settings.server.url, &settings.server.api_key)
            .context("Failed to create Emby client")?;

        Self::setup_with(Arc::new(client), settings, start_polling).await
    }

    pub(crate) async fn setup_with(
        server: Arc<dyn MediaServer>,
        settings: &Settings,
        start_polling: bool,
    ) -> Result<Self> {
        server
            .test_connection()
            .await
            .with_context(|| format!("Error testing Emby connection to {}", settings.server.url))?;

        let posters = PosterCache::new(&settings.posters)?;
        posters.prepare()?;

        let coordinator = Arc::new(StatsCoordinator::new(server, settings.library.clone()));
        coordinator
            .refresh()
            .await
            .context("Initial refresh of Emby statistics failed")?;

        let sensors = build_sensors(&coordinator, &posters);
        let polling = start_polling
            .then(|| PollingLoop::start(Arc::clone(&coordinator), settings.polling.interval()));

        tracing::info!(
            user = coordinator.user_id(),
            sensors = sensors.len(),
            "Emby statistics set up"
        );

        Ok(Self {
            coordinator,
            sensors,
            polling,
        })
    }

    pub fn coordinator(&self) -> &Arc<StatsCoordinator> {
        &self.coordinator
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn polling(&self) -> Option<&PollingLoop> {
        self.polling.as_ref()
    }

    pub async fn read_all(&self) -> Vec<SensorState> {
        let mut states = Vec::with_capacity(self.sensors.len());
        for sensor in &self.sensors {
            states.push(sensor.read().await);
        }
        states
    }

    pub async fn teardown(self) {
        if let Some(polling) = self.polling {
            polling.stop().await;
        }
        tracing::info!("Emby statistics torn down");
    }
}
