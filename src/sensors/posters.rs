use crate::core::models::MediaItem;
use crate::core::settings::PosterSettings;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PLACEHOLDER_FILE: &str = "empty.jpg";
const PLACEHOLDER_IMAGE: &[u8] = include_bytes!("../../assets/empty.png");
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const PARTIAL_EXTENSION: &str = "jpg.part";

/// Item ids become file names, so only plain `[A-Za-z0-9_-]` ids get a poster file.
fn is_safe_id(item_id: &str) -> bool {
    !item_id.is_empty()
        && item_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

struct PosterCacheInner {
    directory: PathBuf,
    public_path: String,
    http: reqwest::Client,
    in_flight: Mutex<HashSet<String>>,
}

/// Append-only poster directory keyed by item id. Files are never refreshed once
/// written.
#[derive(Clone)]
pub struct PosterCache {
    inner: Arc<PosterCacheInner>,
}

impl PosterCache {
    pub fn new(settings: &PosterSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .context("Failed to build poster HTTP client")?;

        Ok(Self {
            inner: Arc::new(PosterCacheInner {
                directory: settings.directory.clone(),
                public_path: settings.public_path.trim_end_matches('/').to_string(),
                http,
                in_flight: Mutex::new(HashSet::new()),
            }),
        })
    }

    /// Creates the directory, writes the placeholder if it is missing and removes
    /// partial downloads left behind by an interrupted run.
    pub fn prepare(&self) -> Result<()> {
        let directory = &self.inner.directory;
        std::fs::create_dir_all(directory)
            .with_context(|| format!("Failed to create poster directory: {}", directory.display()))?;

        let placeholder = directory.join(PLACEHOLDER_FILE);
        if !placeholder.exists() {
            std::fs::write(&placeholder, PLACEHOLDER_IMAGE).with_context(|| {
                format!("Failed to write placeholder: {}", placeholder.display())
            })?;
            tracing::debug!(?placeholder, "Wrote poster placeholder");
        }

        self.remove_partial_downloads()
    }

    fn remove_partial_downloads(&self) -> Result<()> {
        let directory = &self.inner.directory;
        let entries = std::fs::read_dir(directory).with_context(|| {
            format!("Failed to read poster directory: {}", directory.display())
        })?;

        for entry in entries.flatten() {
            let path = entry.path();
            let is_partial = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(PARTIAL_EXTENSION));
            if !is_partial {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(?path, "Removed partial poster download"),
                Err(e) => tracing::warn!(?path, error = %e, "Failed to remove partial poster"),
            }
        }
        Ok(())
    }

    pub fn placeholder_path(&self) -> String {
        format!("{}/{}", self.inner.public_path, PLACEHOLDER_FILE)
    }

    pub fn public_path(&self, item_id: &str) -> String {
        format!("{}/{}.jpg", self.inner.public_path, item_id)
    }

    fn file_path(&self, item_id: &str) -> PathBuf {
        self.inner.directory.join(format!("{item_id}.jpg"))
    }

    /// Returns the path the dashboard should load for `item`. Items without a remote
    /// image, or whose id is not a safe file name, get the placeholder; otherwise a
    /// missing file is fetched in the background and the (possibly not yet written)
    /// local path is returned immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn resolve(&self, item: &MediaItem) -> String {
        let Some(url) = item.image_url.as_deref() else {
            return self.placeholder_path();
        };
        if !is_safe_id(&item.id) {
            tracing::warn!(item_id = %item.id, "Unsafe item id, using placeholder poster");
            return self.placeholder_path();
        }

        let file = self.file_path(&item.id);
        if file.exists() {
            tracing::debug!(item_id = %item.id, "Poster cached");
        } else {
            self.spawn_download(&item.id, url, file);
        }
        self.public_path(&item.id)
    }

    fn spawn_download(&self, item_id: &str, url: &str, file: PathBuf) {
        {
            let mut in_flight = self.inner.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            if !in_flight.insert(item_id.to_string()) {
                return;
            }
        }

        let cache = self.clone();
        let item_id = item_id.to_string();
        let url = url.to_string();
        tokio::spawn(async move {
            // The URL embeds the API key, so only the item id is logged.
            match cache.download(&url, &file).await {
                Ok(bytes) => tracing::debug!(%item_id, bytes, "Downloaded poster"),
                Err(e) => tracing::error!(%item_id, error = %e, "Failed to download poster"),
            }
            cache
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&item_id);
        });
    }

    async fn download(&self, url: &str, file: &Path) -> Result<usize> {
        let response = self
            .inner
            .http
            .get(url)
            .send()
            .await
            .context("Poster request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Poster request returned status {}", response.status());
        }

        let bytes = response.bytes().await.context("Failed to read poster body")?;

        let partial = file.with_extension(PARTIAL_EXTENSION);
        tokio::fs::write(&partial, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", partial.display()))?;
        tokio::fs::rename(&partial, file)
            .await
            .with_context(|| format!("Failed to move poster into {}", file.display()))?;

        Ok(bytes.len())
    }

    #[cfg(test)]
    fn in_flight_count(&self) -> usize {
        self.inner.in_flight.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn cache_in(dir: &Path) -> PosterCache {
        let settings = PosterSettings {
            directory: dir.to_path_buf(),
            public_path: "/local/emby_posters/".to_string(),
        };
        let cache = PosterCache::new(&settings).unwrap();
        cache.prepare().unwrap();
        cache
    }

    fn item(id: &str, image_url: Option<String>) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            title: "Poster test".to_string(),
            date_added: None,
            date_created: None,
            image_url,
        }
    }

    async fn wait_for(path: &Path) -> bool {
        for _ in 0..100 {
            if path.exists() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_prepare_writes_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());

        assert!(dir.path().join(PLACEHOLDER_FILE).exists());
        assert_eq!(cache.placeholder_path(), "/local/emby_posters/empty.jpg");
    }

    #[tokio::test]
    async fn test_prepare_removes_partial_downloads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stale.jpg.part"), b"half").unwrap();
        std::fs::write(dir.path().join("kept.jpg"), b"jpeg").unwrap();

        cache_in(dir.path());

        assert!(!dir.path().join("stale.jpg.part").exists());
        assert!(dir.path().join("kept.jpg").exists());
    }

    #[test]
    fn test_safe_ids() {
        assert!(is_safe_id("a1b2c3"));
        assert!(is_safe_id("series_42-x"));
        assert!(!is_safe_id(""));
        assert!(!is_safe_id("../x"));
        assert!(!is_safe_id("a/b"));
        assert!(!is_safe_id("a.jpg"));
    }

    #[tokio::test]
    async fn test_unsafe_id_never_leaves_poster_directory() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/poster.jpg")
            .with_status(200)
            .with_body(b"fake-jpeg-bytes")
            .expect(0)
            .create_async()
            .await;

        let root = tempfile::tempdir().unwrap();
        let posters = root.path().join("posters");
        let cache = cache_in(&posters);

        let escaping = item("../escaped", Some(format!("{}/poster.jpg", server.url())));
        let path = cache.resolve(&escaping);

        assert_eq!(path, cache.placeholder_path());
        assert_eq!(cache.in_flight_count(), 0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!root.path().join("escaped.jpg").exists());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_item_without_image_uses_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());

        let path = cache.resolve(&item("no-art", None));

        assert_eq!(path, cache.placeholder_path());
        assert_eq!(cache.in_flight_count(), 0);
        assert!(!dir.path().join("no-art.jpg").exists());
    }

    #[tokio::test]
    async fn test_existing_poster_is_not_downloaded_again() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        std::fs::write(dir.path().join("cached.jpg"), b"jpeg").unwrap();

        let path = cache.resolve(&item("cached", Some("http://127.0.0.1:9/never".to_string())));

        assert_eq!(path, "/local/emby_posters/cached.jpg");
        assert_eq!(cache.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_poster_downloads_in_background() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/poster.jpg")
            .with_status(200)
            .with_body(b"fake-jpeg-bytes")
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());
        let poster = item("abc", Some(format!("{}/poster.jpg", server.url())));

        let path = cache.resolve(&poster);
        cache.resolve(&poster);

        assert_eq!(path, "/local/emby_posters/abc.jpg");
        let file = dir.path().join("abc.jpg");
        assert!(wait_for(&file).await);
        assert_eq!(std::fs::read(&file).unwrap(), b"fake-jpeg-bytes");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_download_is_swallowed() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/missing.jpg")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path());

        let path = cache.resolve(&item("gone", Some(format!("{}/missing.jpg", server.url()))));
        assert_eq!(path, "/local/emby_posters/gone.jpg");

        for _ in 0..100 {
            if cache.in_flight_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(cache.in_flight_count(), 0);
        assert!(!dir.path().join("gone.jpg").exists());
    }
}
