use crate::api::wire::ItemDto;
use crate::core::models::{sort_newest_first, MediaItem};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// How many episodes to fetch per requested series; several recent episodes usually
/// belong to the same show.
pub const EPISODE_POOL_FACTOR: usize = 5;

fn parse_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(date) => Some(date.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(date = raw, error = %e, "Ignoring unparseable DateCreated");
            None
        }
    }
}

/// Maps recently added series/movies. The server already sorts by creation date; the
/// list is re-sorted (stably) and truncated so the output holds regardless.
pub fn latest_items<F>(items: Vec<ItemDto>, limit: usize, image_url: F) -> Vec<MediaItem>
where
    F: Fn(&str, &str) -> String,
{
    let mut latest: Vec<MediaItem> = items
        .into_iter()
        .filter_map(|item| {
            let id = item.id.clone()?;
            let url = item.primary_image_tag().map(|tag| image_url(&id, tag));
            let title = item
                .name
                .clone()
                .or_else(|| item.original_title.clone())
                .unwrap_or_else(|| "Unknown".to_string());

            Some(MediaItem {
                title,
                date_added: parse_date(item.date_created.as_deref()),
                date_created: item.date_created.clone(),
                image_url: url,
                id,
            })
        })
        .collect();

    sort_newest_first(&mut latest);
    latest.truncate(limit);
    latest
}

/// Collapses a newest-first episode list into one entry per series, keyed by the
/// series id and carrying the first (newest) episode's date.
pub fn group_by_series<F>(episodes: Vec<ItemDto>, limit: usize, image_url: F) -> Vec<MediaItem>
where
    F: Fn(&str, &str) -> String,
{
    let mut seen = HashSet::new();
    let mut series = Vec::new();

    for episode in episodes {
        let (Some(series_id), Some(series_name)) =
            (episode.series_id.as_deref(), episode.series_name.as_deref())
        else {
            continue;
        };
        if series_id.is_empty() || series_name.is_empty() || !seen.insert(series_id.to_string()) {
            continue;
        }

        let tag = episode
            .primary_image_tag()
            .or(episode.series_primary_image_tag.as_deref());

        series.push(MediaItem {
            id: series_id.to_string(),
            title: series_name.to_string(),
            date_added: parse_date(episode.date_created.as_deref()),
            date_created: episode.date_created.clone(),
            image_url: tag.map(|t| image_url(series_id, t)),
        });
    }

    sort_newest_first(&mut series);
    series.truncate(limit);
    series
}
