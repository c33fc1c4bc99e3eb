use crate::api::error::{EmbyError, Result};
use crate::api::recent::{self, EPISODE_POOL_FACTOR};
use crate::api::wire::{self, ItemsResponse, MediaFolders, NamedEntry};
use crate::api::MediaServer;
use crate::core::models::{ItemKind, MediaItem};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const IMAGE_QUALITY: u8 = 90;

const TOKEN_HEADER: &str = "x-mediabrowser-token";
const CLIENT_HEADERS: [(&str, &str); 3] = [
    ("x-emby-client", "emby-stats"),
    ("x-emby-device-name", "emby-stats"),
    ("x-emby-device-id", "emby_stats_unique_id"),
];

pub struct EmbyClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl EmbyClient {
    /// `server_url` is the server root, e.g. `http://emby.local:8096`; the `/emby`
    /// API prefix is appended here.
    pub fn new(server_url: &str, api_key: &str) -> Result<Self> {
        let api_base = format!("{}/emby", server_url.trim_end_matches('/'));

        // A key that cannot travel in a header can never authenticate.
        let token = HeaderValue::from_str(api_key).map_err(|_| EmbyError::Unauthorized)?;

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(TOKEN_HEADER), token);
        for (name, value) in CLIENT_HEADERS {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|source| EmbyError::Network {
                url: api_base.clone(),
                source,
            })?;

        Ok(Self {
            http,
            api_base,
            api_key: api_key.to_string(),
        })
    }

    pub fn image_url(&self, item_id: &str, tag: &str) -> String {
        format!(
            "{}/Items/{}/Images/Primary?api_key={}&tag={}&quality={}",
            self.api_base, item_id, self.api_key, tag, IMAGE_QUALITY
        )
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}", self.api_base, path);
        tracing::debug!(%url, "GET");

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| EmbyError::Network {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(EmbyError::Unauthorized);
        }
        if status != StatusCode::OK {
            return Err(EmbyError::Api {
                status: status.as_u16(),
                url,
            });
        }

        response
            .json()
            .await
            .map_err(|source| EmbyError::InvalidResponse { url, source })
    }

    async fn get_items(&self, user_id: &str, query: &[(&str, String)]) -> Result<ItemsResponse> {
        self.get(&format!("Users/{user_id}/Items"), query).await
    }
}

fn items_query(library_id: &str, limit: usize, fields: &str) -> Vec<(&'static str, String)> {
    vec![
        ("ParentId", library_id.to_string()),
        ("Recursive", "true".to_string()),
        ("Limit", limit.to_string()),
        ("Fields", fields.to_string()),
    ]
}

fn newest_first(mut query: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
    query.push(("SortBy", "DateCreated".to_string()));
    query.push(("SortOrder", "Descending".to_string()));
    query
}

#[async_trait]
impl MediaServer for EmbyClient {
    async fn test_connection(&self) -> Result<()> {
        let _: serde_json::Value = self.get("System/Info", &[]).await?;
        tracing::debug!(api_base = %self.api_base, "Connection test passed");
        Ok(())
    }

    async fn list_users(&self) -> Result<HashMap<String, String>> {
        let users: Vec<NamedEntry> = self.get("Users", &[]).await?;
        Ok(wire::name_to_id(users))
    }

    async fn list_libraries(&self) -> Result<HashMap<String, String>> {
        let folders: MediaFolders = self.get("Library/MediaFolders", &[]).await?;
        Ok(wire::name_to_id(folders.items))
    }

    async fn count_items(
        &self,
        user_id: &str,
        library_id: &str,
        kind: ItemKind,
        only_unwatched: bool,
    ) -> Result<u64> {
        let mut query = items_query(library_id, 1, "TotalRecordCount");
        query.push(("IncludeItemTypes", kind.as_query().to_string()));
        if only_unwatched {
            query.push(("IsPlayed", "false".to_string()));
        }

        let response = self.get_items(user_id, &query).await?;
        Ok(response.total_record_count.unwrap_or(0))
    }

    async fn list_recent_items(
        &self,
        user_id: &str,
        library_id: &str,
        limit: usize,
    ) -> Result<Vec<MediaItem>> {
        let mut query = newest_first(items_query(
            library_id,
            limit,
            "DateCreated,OriginalTitle,ImageTags",
        ));
        query.push((
            "IncludeItemTypes",
            format!("{},{}", ItemKind::Series.as_query(), ItemKind::Movie.as_query()),
        ));

        let response = self.get_items(user_id, &query).await?;
        Ok(recent::latest_items(response.items, limit, |id, tag| {
            self.image_url(id, tag)
        }))
    }

    async fn list_recent_episodes_grouped_by_series(
        &self,
        user_id: &str,
        library_id: &str,
        limit: usize,
    ) -> Result<Vec<MediaItem>> {
        let mut query = newest_first(items_query(
            library_id,
            limit.saturating_mul(EPISODE_POOL_FACTOR),
            "DateCreated,SeriesName,SeriesId,ImageTags",
        ));
        query.push(("IncludeItemTypes", ItemKind::Episode.as_query().to_string()));

        let response = self.get_items(user_id, &query).await?;
        Ok(recent::group_by_series(response.items, limit, |id, tag| {
            self.image_url(id, tag)
        }))
    }
}
