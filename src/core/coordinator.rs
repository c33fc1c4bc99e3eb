use crate::api::{EmbyError, MediaServer};
use crate::core::models::{ItemKind, LibrarySnapshot, WatchCounts, RECENT_LIMIT};
use crate::core::settings::LibrarySettings;
use crate::core::store::{RefreshState, SnapshotStore};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Builds snapshots from the media server and publishes them to the store.
pub struct StatsCoordinator {
    server: Arc<dyn MediaServer>,
    library: LibrarySettings,
    store: SnapshotStore,
    refresh_lock: Mutex<()>,
}

impl StatsCoordinator {
    pub fn new(server: Arc<dyn MediaServer>, library: LibrarySettings) -> Self {
        Self {
            server,
            library,
            store: SnapshotStore::new(),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.library.user_id
    }

    pub async fn snapshot(&self) -> Option<Arc<LibrarySnapshot>> {
        self.store.snapshot().await
    }

    pub async fn state(&self) -> RefreshState {
        self.store.state().await
    }

    pub async fn last_error(&self) -> Option<String> {
        self.store.last_error().await
    }

    /// Runs one full refresh cycle. Concurrent callers queue behind the running cycle.
    /// On error the previously published snapshot is kept and the error is returned.
    pub async fn refresh(&self) -> Result<Arc<LibrarySnapshot>, EmbyError> {
        let _guard = self.refresh_lock.lock().await;
        self.store.begin_refresh().await;

        match self.fetch_snapshot().await {
            Ok(snapshot) => {
                tracing::info!(
                    tvshows = snapshot.tvshows.total,
                    movies = snapshot.movies.total,
                    episodes = snapshot.total_episodes,
                    "Refreshed library statistics"
                );
                Ok(self.store.publish(snapshot).await)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    retryable = e.is_retryable(),
                    "Failed to refresh library statistics, keeping previous snapshot"
                );
                self.store.record_failure(e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn fetch_snapshot(&self) -> Result<LibrarySnapshot, EmbyError> {
        let server = self.server.as_ref();
        let user = self.library.user_id.as_str();
        let tv = self.library.tv_library_id.as_str();
        let movies = self.library.movie_library_id.as_str();

        let (
            tv_total,
            movie_total,
            tv_unwatched,
            movie_unwatched,
            total_episodes,
            latest_tvshows,
            latest_movies,
            latest_updated_tvshows,
        ) = tokio::try_join!(
            server.count_items(user, tv, ItemKind::Series, false),
            server.count_items(user, movies, ItemKind::Movie, false),
            server.count_items(user, tv, ItemKind::Series, true),
            server.count_items(user, movies, ItemKind::Movie, true),
            server.count_items(user, tv, ItemKind::Episode, false),
            server.list_recent_items(user, tv, RECENT_LIMIT),
            server.list_recent_items(user, movies, RECENT_LIMIT),
            server.list_recent_episodes_grouped_by_series(user, tv, RECENT_LIMIT),
        )?;

        Ok(LibrarySnapshot {
            tvshows: WatchCounts::new(tv_total, tv_unwatched),
            movies: WatchCounts::new(movie_total, movie_unwatched),
            total_episodes,
            latest_tvshows,
            latest_movies,
            latest_updated_tvshows,
            updated_at: Utc::now(),
        })
    }
}
