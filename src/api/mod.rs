mod client;
mod error;
mod recent;
mod wire;

use crate::core::models::{ItemKind, MediaItem};
use async_trait::async_trait;
use std::collections::HashMap;

pub use client::EmbyClient;
pub use error::{EmbyError, Result};

/// Read-only view of the media server used by the coordinator.
#[async_trait]
pub trait MediaServer: Send + Sync {
    async fn test_connection(&self) -> Result<()>;

    async fn list_users(&self) -> Result<HashMap<String, String>>;

    async fn list_libraries(&self) -> Result<HashMap<String, String>>;

    async fn count_items(
        &self,
        user_id: &str,
        library_id: &str,
        kind: ItemKind,
        only_unwatched: bool,
    ) -> Result<u64>;

    async fn list_recent_items(
        &self,
        user_id: &str,
        library_id: &str,
        limit: usize,
    ) -> Result<Vec<MediaItem>>;

    async fn list_recent_episodes_grouped_by_series(
        &self,
        user_id: &str,
        library_id: &str,
        limit: usize,
    ) -> Result<Vec<MediaItem>>;
}
