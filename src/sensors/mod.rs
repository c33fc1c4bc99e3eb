mod posters;

use crate::core::coordinator::StatsCoordinator;
use crate::core::models::{day_label, LibrarySnapshot, MediaItem, RECENT_LIMIT};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

pub use posters::PosterCache;

const ITEMS_UNIT: &str = "items";
const MEASUREMENT: &str = "measurement";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKey {
    TotalTvshows,
    TotalMovies,
    UnwatchedTvshows,
    UnwatchedMovies,
    WatchedTvshows,
    WatchedMovies,
    TotalEpisodes,
    LastTvshows,
    LastMovies,
    LastUpdatedTvshows,
}

pub struct SensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub unit: Option<&'static str>,
}

impl SensorKey {
    pub const ALL: [SensorKey; 10] = [
        SensorKey::TotalTvshows,
        SensorKey::TotalMovies,
        SensorKey::UnwatchedTvshows,
        SensorKey::UnwatchedMovies,
        SensorKey::WatchedTvshows,
        SensorKey::WatchedMovies,
        SensorKey::TotalEpisodes,
        SensorKey::LastTvshows,
        SensorKey::LastMovies,
        SensorKey::LastUpdatedTvshows,
    ];

    pub fn description(&self) -> SensorDescription {
        let (key, name, icon, unit) = match self {
            SensorKey::TotalTvshows => (
                "total_tvshows",
                "Total TV Shows",
                "mdi:television-classic",
                Some(ITEMS_UNIT),
            ),
            SensorKey::TotalMovies => (
                "total_movies",
                "Total Movies",
                "mdi:movie",
                Some(ITEMS_UNIT),
            ),
            SensorKey::UnwatchedTvshows => (
                "unwatched_tvshows",
                "Unwatched TV Shows",
                "mdi:eye-off",
                Some(ITEMS_UNIT),
            ),
            SensorKey::UnwatchedMovies => (
                "unwatched_movies",
                "Unwatched Movies",
                "mdi:eye-off",
                Some(ITEMS_UNIT),
            ),
            SensorKey::WatchedTvshows => (
                "watched_tvshows",
                "Watched TV Shows",
                "mdi:eye",
                Some(ITEMS_UNIT),
            ),
            SensorKey::WatchedMovies => (
                "watched_movies",
                "Watched Movies",
                "mdi:eye",
                Some(ITEMS_UNIT),
            ),
            SensorKey::TotalEpisodes => (
                "total_episodes",
                "Total Episodes",
                "mdi:file-video",
                Some(ITEMS_UNIT),
            ),
            SensorKey::LastTvshows => (
                "last_tvshows_title",
                "Last TV Shows",
                "mdi:new-box",
                None,
            ),
            SensorKey::LastMovies => ("last_movies_title", "Last Movies", "mdi:new-box", None),
            SensorKey::LastUpdatedTvshows => (
                "last_updated_tvshows_title",
                "Last Updated TV Shows",
                "mdi:update",
                None,
            ),
        };

        SensorDescription {
            key,
            name,
            icon,
            unit,
        }
    }

    fn count(&self, snapshot: &LibrarySnapshot) -> Option<u64> {
        match self {
            SensorKey::TotalTvshows => Some(snapshot.tvshows.total),
            SensorKey::TotalMovies => Some(snapshot.movies.total),
            SensorKey::UnwatchedTvshows => Some(snapshot.tvshows.unwatched),
            SensorKey::UnwatchedMovies => Some(snapshot.movies.unwatched),
            SensorKey::WatchedTvshows => Some(snapshot.tvshows.watched()),
            SensorKey::WatchedMovies => Some(snapshot.movies.watched()),
            SensorKey::TotalEpisodes => Some(snapshot.total_episodes),
            _ => None,
        }
    }
}

/// One list entry as published in attributes: `image_url` is the local poster path and
/// `date_added` the server's raw `DateCreated`.
#[derive(Debug, Clone, Serialize)]
pub struct PresentedItem {
    pub id: String,
    pub title: String,
    pub date_added: Option<String>,
    #[serde(skip)]
    pub added_at: Option<DateTime<Utc>>,
    pub image_url: String,
    pub image_url_original: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorState {
    pub object_id: String,
    pub name: &'static str,
    pub icon: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<&'static str>,
    pub available: bool,
    pub state: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_picture: Option<String>,
    pub attributes: Map<String, Value>,
}

pub struct Sensor {
    key: SensorKey,
    object_id: String,
    coordinator: Arc<StatsCoordinator>,
    posters: PosterCache,
}

impl Sensor {
    pub fn new(key: SensorKey, coordinator: Arc<StatsCoordinator>, posters: PosterCache) -> Self {
        let user = coordinator.user_id().to_lowercase().replace(' ', "_");
        let object_id = format!("emby_stats_{}_{}", user, key.description().key);
        Self {
            key,
            object_id,
            coordinator,
            posters,
        }
    }

    /// Reads the current value from the last published snapshot. List sensors may kick
    /// off poster downloads as a side effect; the read never waits for them.
    pub async fn read(&self) -> SensorState {
        let description = self.key.description();
        let mut state = SensorState {
            object_id: self.object_id.clone(),
            name: description.name,
            icon: description.icon,
            unit: description.unit,
            state_class: description.unit.map(|_| MEASUREMENT),
            available: false,
            state: Value::Null,
            entity_picture: None,
            attributes: Map::new(),
        };

        let Some(snapshot) = self.coordinator.snapshot().await else {
            return state;
        };
        state.available = true;

        if let Some(count) = self.key.count(&snapshot) {
            state.state = json!(count);
            return state;
        }

        let (title, items) = match self.key {
            SensorKey::LastTvshows => (snapshot.last_tvshows_title(), &snapshot.latest_tvshows),
            SensorKey::LastMovies => (snapshot.last_movies_title(), &snapshot.latest_movies),
            _ => (
                snapshot.last_updated_tvshows_title(),
                &snapshot.latest_updated_tvshows,
            ),
        };
        state.state = json!(title);

        let presented = self.present(items, self.key == SensorKey::LastUpdatedTvshows);
        state.entity_picture = Some(
            presented
                .first()
                .map(|i| i.image_url.clone())
                .unwrap_or_else(|| self.posters.placeholder_path()),
        );
        state.attributes = if self.key == SensorKey::LastUpdatedTvshows {
            updated_series_attributes(&presented)
        } else {
            latest_item_attributes(&presented)
        };
        state
    }

    fn present(&self, items: &[MediaItem], unique: bool) -> Vec<PresentedItem> {
        let mut seen = HashSet::new();
        items
            .iter()
            .filter(|item| !unique || seen.insert(item.id.as_str()))
            .take(RECENT_LIMIT)
            .map(|item| PresentedItem {
                id: item.id.clone(),
                title: item.title.clone(),
                date_added: item.date_created.clone(),
                added_at: item.date_added,
                image_url: self.posters.resolve(item),
                image_url_original: item.image_url.clone(),
            })
            .collect()
    }
}

fn digest(items: &[PresentedItem]) -> Vec<String> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "**{}.** {} ({})",
                i + 1,
                item.title,
                day_label(item.added_at)
            )
        })
        .collect()
}

fn latest_item_attributes(items: &[PresentedItem]) -> Map<String, Value> {
    let mut attributes = Map::new();
    let Some(first) = items.first() else {
        attributes.insert("status".into(), json!("No recent items found"));
        return attributes;
    };

    attributes.insert("Top 10 Recently Added".into(), json!(digest(items).join("\n")));
    attributes.insert("Most Recent Item ID".into(), json!(first.id));
    attributes.insert("Most Recent Added Date".into(), json!(first.date_added));
    attributes.insert("Item List (JSON)".into(), json!(items));
    attributes
}

fn updated_series_attributes(items: &[PresentedItem]) -> Map<String, Value> {
    let mut attributes = Map::new();
    if items.is_empty() {
        attributes.insert("status".into(), json!("No recently updated series found"));
        return attributes;
    }

    attributes.insert("Top 10 Latest Updated Series".into(), json!(digest(items)));
    attributes.insert("Item List (JSON)".into(), json!(items));
    attributes
}

pub fn build_sensors(coordinator: &Arc<StatsCoordinator>, posters: &PosterCache) -> Vec<Sensor> {
    SensorKey::ALL
        .iter()
        .map(|key| Sensor::new(*key, Arc::clone(coordinator), posters.clone()))
        .collect()
}
