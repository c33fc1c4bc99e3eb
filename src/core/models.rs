use chrono::{DateTime, Utc};
use serde::Serialize;

/// Maximum number of entries kept in every "most recent" list.
pub const RECENT_LIMIT: usize = 10;

/// Item types understood by the `IncludeItemTypes` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Series,
    Movie,
    Episode,
}

impl ItemKind {
    pub fn as_query(&self) -> &'static str {
        match self {
            ItemKind::Series => "Series",
            ItemKind::Movie => "Movie",
            ItemKind::Episode => "Episode",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaItem {
    pub id: String,
    pub title: String,
    pub date_added: Option<DateTime<Utc>>,
    /// `DateCreated` exactly as the server sent it, republished untouched.
    pub date_created: Option<String>,
    pub image_url: Option<String>,
}

/// `YYYY-MM-DD` form of a creation date, used in digests.
pub fn day_label(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Stable descending sort by creation date. Undated items compare as older than any
/// dated one and therefore end up last.
pub fn sort_newest_first(items: &mut [MediaItem]) {
    items.sort_by(|a, b| b.date_added.cmp(&a.date_added));
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WatchCounts {
    pub total: u64,
    pub unwatched: u64,
}

impl WatchCounts {
    pub fn new(total: u64, unwatched: u64) -> Self {
        Self { total, unwatched }
    }

    pub fn watched(&self) -> u64 {
        self.total.saturating_sub(self.unwatched)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibrarySnapshot {
    pub tvshows: WatchCounts,
    pub movies: WatchCounts,
    pub total_episodes: u64,
    pub latest_tvshows: Vec<MediaItem>,
    pub latest_movies: Vec<MediaItem>,
    pub latest_updated_tvshows: Vec<MediaItem>,
    pub updated_at: DateTime<Utc>,
}

impl LibrarySnapshot {
    pub fn last_tvshows_title(&self) -> &str {
        first_title(&self.latest_tvshows)
    }

    pub fn last_movies_title(&self) -> &str {
        first_title(&self.latest_movies)
    }

    pub fn last_updated_tvshows_title(&self) -> &str {
        first_title(&self.latest_updated_tvshows)
    }
}

fn first_title(items: &[MediaItem]) -> &str {
    items.first().map(|i| i.title.as_str()).unwrap_or("None")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(id: &str, day: Option<u32>) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            title: format!("Title {id}"),
            date_added: day.map(|d| Utc.with_ymd_and_hms(2026, 3, d, 12, 0, 0).unwrap()),
            date_created: None,
            image_url: None,
        }
    }

    #[test]
    fn test_watched_is_difference() {
        assert_eq!(WatchCounts::new(120, 20).watched(), 100);
        assert_eq!(WatchCounts::new(5, 5).watched(), 0);
    }

    #[test]
    fn test_watched_never_negative() {
        assert_eq!(WatchCounts::new(3, 9).watched(), 0);
        assert_eq!(WatchCounts::new(0, u64::MAX).watched(), 0);
    }

    #[test]
    fn test_sort_newest_first_is_stable() {
        let mut items = vec![
            item("a", Some(1)),
            item("b", Some(5)),
            item("c", Some(5)),
            item("d", Some(3)),
        ];
        sort_newest_first(&mut items);

        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "d", "a"]);
    }

    #[test]
    fn test_undated_items_sort_last() {
        let mut items = vec![item("x", None), item("y", Some(2)), item("z", Some(9))];
        sort_newest_first(&mut items);

        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "y", "x"]);
    }

    #[test]
    fn test_date_label() {
        assert_eq!(day_label(item("a", Some(7)).date_added), "2026-03-07");
        assert_eq!(day_label(None), "unknown");
    }

    #[test]
    fn test_titles_fall_back_to_none() {
        let snapshot = LibrarySnapshot {
            tvshows: WatchCounts::default(),
            movies: WatchCounts::default(),
            total_episodes: 0,
            latest_tvshows: vec![item("a", Some(1))],
            latest_movies: Vec::new(),
            latest_updated_tvshows: Vec::new(),
            updated_at: Utc::now(),
        };

        assert_eq!(snapshot.last_tvshows_title(), "Title a");
        assert_eq!(snapshot.last_movies_title(), "None");
        assert_eq!(snapshot.last_updated_tvshows_title(), "None");
    }
}
