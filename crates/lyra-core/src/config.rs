use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::clock::TimeZoneSetting;
use crate::error::{LyraError, Result};

/// Origin used when the base URL is empty. A terminal has no page origin, so
/// "same origin" means the local Lyra backend.
pub const DEFAULT_ORIGIN: &str = "http://localhost:8000";

/// Number of apps shown in the start menu
pub const DEFAULT_RECOMMENDED_LIMIT: usize = 12;

pub const ENV_API_BASE_URL: &str = "LYRA_API_BASE_URL";
pub const ENV_TIMEZONE: &str = "LYRA_TIMEZONE";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    /// IANA zone name; empty or missing means the system zone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_limit: Option<usize>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Apply `LYRA_*` environment variables on top of the file values
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_API_BASE_URL) {
            self.api_base_url = Some(url);
        }
        if let Some(tz) = lookup(ENV_TIMEZONE) {
            self.timezone = Some(tz);
        }
        self
    }

    /// Resolved base URL without a trailing slash
    pub fn base_url(&self) -> String {
        let raw = self.api_base_url.as_deref().unwrap_or("").trim();
        if raw.is_empty() {
            DEFAULT_ORIGIN.to_string()
        } else {
            raw.trim_end_matches('/').to_string()
        }
    }

    pub fn apps_endpoint(&self) -> String {
        format!("{}/api/apps", self.base_url())
    }

    pub fn chat_endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url())
    }

    pub fn recommended_limit(&self) -> usize {
        self.recommended_limit.unwrap_or(DEFAULT_RECOMMENDED_LIMIT)
    }

    pub fn timezone(&self) -> Result<TimeZoneSetting> {
        TimeZoneSetting::parse(self.timezone.as_deref().unwrap_or(""))
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(LyraError::NoConfigDir)?;

        Ok(config_dir.join("lyra-os").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_base_url_resolves_to_default_origin() {
        let config = Config::new();
        assert_eq!(config.apps_endpoint(), "http://localhost:8000/api/apps");
        assert_eq!(config.chat_endpoint(), "http://localhost:8000/api/chat");
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let config = Config {
            api_base_url: Some("https://lyra.example.com/".into()),
            ..Config::default()
        };
        assert_eq!(config.chat_endpoint(), "https://lyra.example.com/api/chat");
    }

    #[test]
    fn test_env_overrides_file_values() {
        let config = Config {
            api_base_url: Some("http://file".into()),
            timezone: Some("Asia/Tokyo".into()),
            recommended_limit: None,
        }
        .with_overrides_from(|key| match key {
            ENV_API_BASE_URL => Some("http://env".to_string()),
            _ => None,
        });

        assert_eq!(config.base_url(), "http://env");
        assert_eq!(config.timezone.as_deref(), Some("Asia/Tokyo"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.recommended_limit(), DEFAULT_RECOMMENDED_LIMIT);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            api_base_url: Some("http://127.0.0.1:9000".into()),
            timezone: Some("Europe/Berlin".into()),
            recommended_limit: Some(6),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unknown_timezone_is_an_error() {
        let config = Config {
            timezone: Some("Mars/Olympus_Mons".into()),
            ..Config::default()
        };
        assert!(matches!(
            config.timezone(),
            Err(LyraError::UnknownTimezone(_))
        ));
    }
}
