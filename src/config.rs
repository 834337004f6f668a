use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Deployment override for `api_url`.
pub const API_URL_ENV: &str = "HUM_REMOVER_API_URL";

const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the hum removal service.
    pub api_url: String,
    /// IANA timezone used for the regional frequency hint.
    pub timezone: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            timezone: None,
        }
    }
}

impl Config {
    /// Directory: ~/.config/hum-remover/
    fn dir() -> PathBuf {
        let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("hum-remover");
        p
    }

    fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from disk, then apply environment overrides. Missing or invalid
    /// files yield defaults.
    pub fn load() -> Self {
        let mut config = match fs::read_to_string(Self::path()) {
            Ok(data) => Self::parse(&data),
            Err(_) => Self::default(),
        };
        config.apply_env(
            std::env::var(API_URL_ENV).ok(),
            std::env::var("TZ").ok(),
        );
        config
    }

    fn parse(data: &str) -> Self {
        serde_json::from_str(data).unwrap_or_else(|e| {
            log::warn!("Ignoring invalid config file: {e}");
            Self::default()
        })
    }

    fn apply_env(&mut self, api_url: Option<String>, tz: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = url;
        }
        if self.timezone.is_none() {
            self.timezone = tz.filter(|t| !t.trim().is_empty());
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let dir = Self::dir();
        fs::create_dir_all(&dir)?;
        let data = serde_json::to_string_pretty(self)?;
        fs::write(Self::path(), data)?;
        log::info!("Saved config to {}", Self::path().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::parse(r#"{"timezone":"Europe/Oslo"}"#);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timezone.as_deref(), Some("Europe/Oslo"));
    }

    #[test]
    fn invalid_file_yields_defaults() {
        assert_eq!(Config::parse("{not json"), Config::default());
    }

    #[test]
    fn environment_overrides_url_but_not_explicit_timezone() {
        let mut config = Config::parse(r#"{"timezone":"Asia/Tokyo"}"#);
        config.apply_env(
            Some("https://hum.example.net".into()),
            Some("Europe/Paris".into()),
        );
        assert_eq!(config.api_url, "https://hum.example.net");
        assert_eq!(config.timezone.as_deref(), Some("Asia/Tokyo"));

        let mut config = Config::default();
        config.apply_env(Some("  ".into()), Some("America/Chicago".into()));
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timezone.as_deref(), Some("America/Chicago"));
    }
}
