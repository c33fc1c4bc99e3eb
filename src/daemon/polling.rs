use crate::core::coordinator::StatsCoordinator;
use crate::core::models::LibrarySnapshot;
use crate::core::settings::MAX_INTERVAL_MINUTES;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const MIN_PERIOD: Duration = Duration::from_millis(10);
const MAX_PERIOD: Duration = Duration::from_secs(MAX_INTERVAL_MINUTES * 60);

#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Updated(Arc<LibrarySnapshot>),
    Failed(String),
}

/// Background task refreshing the coordinator every `interval`, or sooner when
/// triggered. The first tick is one full interval away; setup performs the initial
/// refresh itself.
///
/// Only the task holds the outcome sender, so subscribers see the channel close as
/// soon as the task ends for any reason.
pub struct PollingLoop {
    trigger_tx: mpsc::UnboundedSender<()>,
    outcomes: broadcast::Receiver<RefreshOutcome>,
    handle: JoinHandle<()>,
}

impl PollingLoop {
    /// `interval` is clamped to between 10 ms and one week.
    pub fn start(coordinator: Arc<StatsCoordinator>, interval: Duration) -> Self {
        let interval = interval.clamp(MIN_PERIOD, MAX_PERIOD);
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let (sender, outcomes) = broadcast::channel(16);

        let handle = tokio::spawn(run_polling_loop(coordinator, interval, trigger_rx, sender));
        tracing::info!(interval_secs = interval.as_secs(), "Polling loop started");

        Self {
            trigger_tx,
            outcomes,
            handle,
        }
    }

    pub fn trigger_refresh(&self) {
        if self.trigger_tx.send(()).is_err() {
            tracing::warn!("Polling loop is not running, refresh request dropped");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshOutcome> {
        self.outcomes.resubscribe()
    }

    pub async fn stop(self) {
        self.handle.abort();
        let _ = self.handle.await;
        tracing::info!("Polling loop stopped");
    }
}

async fn run_polling_loop(
    coordinator: Arc<StatsCoordinator>,
    period: Duration,
    mut trigger_rx: mpsc::UnboundedReceiver<()>,
    outcomes: broadcast::Sender<RefreshOutcome>,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                tracing::debug!("Scheduled refresh");
            }
            Some(()) = trigger_rx.recv() => {
                tracing::info!("Manual refresh requested");
                interval.reset();
            }
        }

        let outcome = match coordinator.refresh().await {
            Ok(snapshot) => RefreshOutcome::Updated(snapshot),
            Err(e) => RefreshOutcome::Failed(e.to_string()),
        };
        // No subscribers is fine; the snapshot store is the source of truth.
        let _ = outcomes.send(outcome);
    }
}
