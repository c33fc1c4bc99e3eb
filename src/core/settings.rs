use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub library: LibrarySettings,
    pub polling: PollingSettings,
    pub posters: PosterSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    pub user_id: String,
    pub tv_library_id: String,
    pub movie_library_id: String,
}

/// Longest accepted polling interval: one week.
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub interval_minutes: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_minutes: 30,
        }
    }
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PosterSettings {
    pub directory: PathBuf,
    pub public_path: String,
}

impl Default for PosterSettings {
    fn default() -> Self {
        Self {
            directory: dirs::cache_dir()
                .map(|p| p.join("emby-stats").join("posters"))
                .unwrap_or_else(|| PathBuf::from("emby_posters")),
            public_path: "/local/emby_posters".to_string(),
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("emby-stats").join("config.toml"))
    }

    /// Loads from `path`, or from the default location when none is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path().context("Could not determine config directory")?,
        };

        if !path.exists() {
            tracing::info!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(?path, "Loaded config");
        Ok(settings)
    }

    pub fn validate_server(&self) -> Result<()> {
        if self.server.url.trim().is_empty() {
            anyhow::bail!("server.url must be set");
        }
        if self.server.api_key.trim().is_empty() {
            anyhow::bail!("server.api_key must be set");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_server()?;

        let selection = [
            ("library.user_id", &self.library.user_id),
            ("library.tv_library_id", &self.library.tv_library_id),
            ("library.movie_library_id", &self.library.movie_library_id),
        ];
        for (key, value) in selection {
            if value.trim().is_empty() {
                anyhow::bail!("{key} must be set (run `emby-stats discover` to list ids)");
            }
        }

        if self.polling.interval_minutes == 0 {
            anyhow::bail!("polling.interval_minutes must be greater than 0");
        }
        if self.polling.interval_minutes > MAX_INTERVAL_MINUTES {
            anyhow::bail!(
                "polling.interval_minutes must be at most {MAX_INTERVAL_MINUTES} (one week)"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_settings() -> Settings {
        let mut settings = Settings::default();
        settings.server.url = "http://emby.local:8096".to_string();
        settings.server.api_key = "secret".to_string();
        settings.library.user_id = "user-1".to_string();
        settings.library.tv_library_id = "tv".to_string();
        settings.library.movie_library_id = "movies".to_string();
        settings
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.polling.interval_minutes, 30);
        assert_eq!(settings.polling.interval(), Duration::from_secs(1800));
        assert_eq!(settings.posters.public_path, "/local/emby_posters");
        assert!(settings.server.url.is_empty());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = complete_settings();
        assert!(settings.validate().is_ok());

        settings.polling.interval_minutes = 0;
        assert!(settings.validate().is_err());

        settings.polling.interval_minutes = MAX_INTERVAL_MINUTES;
        assert!(settings.validate().is_ok());
        settings.polling.interval_minutes = MAX_INTERVAL_MINUTES + 1;
        assert!(settings.validate().is_err());
        settings.polling.interval_minutes = u64::MAX / 60;
        assert!(settings.validate().is_err());

        let mut settings = complete_settings();
        settings.library.movie_library_id = "  ".to_string();
        assert!(settings.validate().is_err());
        assert!(settings.validate_server().is_ok());

        let mut settings = complete_settings();
        settings.server.api_key.clear();
        assert!(settings.validate_server().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [server]
            url = "http://emby.local:8096"
            api_key = "abc123"

            [library]
            user_id = "u1"
            tv_library_id = "tv1"
            movie_library_id = "mv1"

            [polling]
            interval_minutes = 15

            [posters]
            directory = "/config/www/emby_posters"
        "#;

        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.server.api_key, "abc123");
        assert_eq!(settings.library.tv_library_id, "tv1");
        assert_eq!(settings.polling.interval(), Duration::from_secs(900));
        assert_eq!(
            settings.posters.directory,
            PathBuf::from("/config/www/emby_posters")
        );
        assert_eq!(settings.posters.public_path, "/local/emby_posters");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert!(settings.server.url.is_empty());
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nurl = ").unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }
}
