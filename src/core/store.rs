use crate::core::models::LibrarySnapshot;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefreshState {
    Idle,
    Refreshing,
    Failed,
}

struct StoreInner {
    snapshot: Option<Arc<LibrarySnapshot>>,
    state: RefreshState,
    last_error: Option<String>,
}

impl Default for StoreInner {
    fn default() -> Self {
        Self {
            snapshot: None,
            state: RefreshState::Idle,
            last_error: None,
        }
    }
}

/// Holds the last published snapshot. Snapshots are replaced whole; a failed refresh
/// only records the error and leaves the snapshot in place.
#[derive(Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Option<Arc<LibrarySnapshot>> {
        self.inner.read().await.snapshot.clone()
    }

    pub async fn state(&self) -> RefreshState {
        self.inner.read().await.state
    }

    pub async fn last_error(&self) -> Option<String> {
        self.inner.read().await.last_error.clone()
    }

    pub async fn begin_refresh(&self) {
        self.inner.write().await.state = RefreshState::Refreshing;
    }

    pub async fn publish(&self, snapshot: LibrarySnapshot) -> Arc<LibrarySnapshot> {
        let snapshot = Arc::new(snapshot);
        let mut inner = self.inner.write().await;
        inner.snapshot = Some(Arc::clone(&snapshot));
        inner.state = RefreshState::Idle;
        inner.last_error = None;
        snapshot
    }

    pub async fn record_failure(&self, error: String) {
        let mut inner = self.inner.write().await;
        inner.state = RefreshState::Failed;
        inner.last_error = Some(error);
    }
}
