//! Configuration settings management
//!
//! This module handles loading configuration from multiple sources,
//! validation, and persistence.

use crate::error::{Result, VaultKrateError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BALANCER_URL: &str =
    "https://vault-krate-balancer-946317982825.europe-west1.run.app";
pub const DEFAULT_SITE_URL: &str = "https://vault-krate.app";

/// Environment variable prefix, e.g. `VK_BALANCER_URL`
pub const ENV_PREFIX: &str = "VK";

/// Language used for user-facing notifications
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "es" | "spanish" | "español" => Ok(Self::Es),
            _ => Err(format!("Unsupported locale: '{}'. Expected 'en' or 'es'", s)),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::En => write!(f, "en"),
            Self::Es => write!(f, "es"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug: bool,
    /// Base URL of the balancer service all API calls go to
    pub balancer_url: String,
    /// Base URL of the public site, used to build shareable links
    pub site_url: String,
    pub health_refresh_secs: u64,
    pub dashboard_refresh_secs: u64,
    pub api_timeout_ms: u64,
    pub health_timeout_ms: u64,
    pub locale: Locale,
    pub output_json: bool,
    pub no_color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            balancer_url: DEFAULT_BALANCER_URL.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            health_refresh_secs: 30,
            dashboard_refresh_secs: 60,
            api_timeout_ms: 10_000,
            health_timeout_ms: 5_000,
            locale: Locale::En,
            output_json: false,
            no_color: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        validate_base_url("balancer_url", &self.balancer_url)?;
        validate_base_url("site_url", &self.site_url)?;

        if self.health_refresh_secs == 0 || self.dashboard_refresh_secs == 0 {
            return Err(VaultKrateError::config(
                "Refresh intervals must be greater than zero",
            ));
        }

        if self.api_timeout_ms == 0 || self.health_timeout_ms == 0 {
            return Err(VaultKrateError::config("Timeouts must be greater than zero"));
        }

        Ok(())
    }

    pub fn health_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.health_refresh_secs)
    }

    pub fn dashboard_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.dashboard_refresh_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    /// Directory holding the config file and the saved session
    pub fn config_dir() -> Result<PathBuf> {
        // Use XDG Base Directory specification on Linux and macOS
        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            use std::env;
            let config_dir = if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
                PathBuf::from(xdg_config_home)
            } else {
                let home_dir = env::var("HOME")
                    .map_err(|_| VaultKrateError::config("HOME environment variable not set"))?;
                PathBuf::from(home_dir).join(".config")
            };
            Ok(config_dir.join("vk"))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            let config_dir = dirs::config_dir()
                .ok_or_else(|| VaultKrateError::config("Unable to determine config directory"))?;
            Ok(config_dir.join("vk"))
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("vk.conf"))
    }

    pub async fn load() -> Result<Self> {
        load_config().await
    }

    pub async fn save(&self) -> Result<()> {
        save_config(self).await
    }

    /// Apply a `vk config set` style update
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "balancer_url" => self.balancer_url = value.trim_end_matches('/').to_string(),
            "site_url" => self.site_url = value.trim_end_matches('/').to_string(),
            "health_refresh_secs" => self.health_refresh_secs = parse_number(key, value)?,
            "dashboard_refresh_secs" => self.dashboard_refresh_secs = parse_number(key, value)?,
            "api_timeout_ms" => self.api_timeout_ms = parse_number(key, value)?,
            "health_timeout_ms" => self.health_timeout_ms = parse_number(key, value)?,
            "locale" => {
                self.locale = value.parse().map_err(VaultKrateError::invalid_argument)?;
            }
            "debug" => self.debug = parse_bool(key, value)?,
            "output_json" => self.output_json = parse_bool(key, value)?,
            "no_color" => self.no_color = parse_bool(key, value)?,
            _ => {
                return Err(VaultKrateError::invalid_argument(format!(
                    "Unknown configuration key: '{}'",
                    key
                )))
            }
        }
        Ok(())
    }

    /// Setting name/value pairs for display
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("balancer_url", self.balancer_url.clone()),
            ("site_url", self.site_url.clone()),
            ("health_refresh_secs", self.health_refresh_secs.to_string()),
            ("dashboard_refresh_secs", self.dashboard_refresh_secs.to_string()),
            ("api_timeout_ms", self.api_timeout_ms.to_string()),
            ("health_timeout_ms", self.health_timeout_ms.to_string()),
            ("locale", self.locale.to_string()),
            ("debug", self.debug.to_string()),
            ("output_json", self.output_json.to_string()),
            ("no_color", self.no_color.to_string()),
        ]
    }
}

fn validate_base_url(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(VaultKrateError::config(format!("{} is required", key)));
    }

    let parsed = url::Url::parse(value)
        .map_err(|e| VaultKrateError::config(format!("{} is not a valid URL: {}", key, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(VaultKrateError::config(format!(
            "{} must use http or https, got '{}'",
            key, other
        ))),
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value.parse::<u64>().map_err(|_| {
        VaultKrateError::invalid_argument(format!("{} expects a number, got '{}'", key, value))
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(VaultKrateError::invalid_argument(format!(
            "{} expects true or false, got '{}'",
            key, value
        ))),
    }
}

/// Load configuration from multiple sources with priority order:
/// 1. Command-line flags (applied by the CLI after loading)
/// 2. Environment variables (`VK_*`)
/// 3. Configuration file
/// 4. Default values
pub async fn load_config() -> Result<Config> {
    let config = load_config_no_validation().await?;

    config.validate()?;

    Ok(config)
}

/// Load configuration without validation (for init and config commands)
pub async fn load_config_no_validation() -> Result<Config> {
    let config_path = Config::get_config_path()?;
    load_config_from(&config_path)
}

/// Layer defaults, the TOML file at `path` (if present) and the environment
pub fn load_config_from(path: &Path) -> Result<Config> {
    let defaults = config::Config::try_from(&Config::default())?;

    let layered = config::Config::builder()
        .add_source(defaults)
        .add_source(
            config::File::from(path.to_path_buf())
                .format(config::FileFormat::Toml)
                .required(false),
        )
        .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()?;

    let mut config: Config = layered.try_deserialize()?;
    config.balancer_url = config.balancer_url.trim_end_matches('/').to_string();
    config.site_url = config.site_url.trim_end_matches('/').to_string();

    debug!(
        "Loaded configuration (file: {}, balancer: {})",
        path.display(),
        config.balancer_url
    );

    Ok(config)
}

pub async fn save_config(config: &Config) -> Result<()> {
    let config_path = Config::get_config_path()?;
    save_config_to(config, &config_path).await
}

pub async fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| VaultKrateError::serialization(e.to_string()))?;

    tokio::fs::write(path, contents).await?;

    Ok(())
}

/// Write a default config file unless one already exists
pub async fn init_default_config() -> Result<PathBuf> {
    let config_path = Config::get_config_path()?;

    // Don't overwrite existing configuration
    if config_path.exists() {
        return Ok(config_path);
    }

    save_config_to(&Config::default(), &config_path).await?;

    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.health_refresh_interval(), Duration::from_secs(30));
        assert_eq!(config.dashboard_refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.api_timeout(), Duration::from_secs(10));
        assert_eq!(config.health_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let mut config = Config::default();
        config.balancer_url = String::new();
        assert!(config.validate().is_err());

        config.balancer_url = "ftp://balancer.example".to_string();
        assert!(config.validate().is_err());

        config.balancer_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let mut config = Config::default();
        config.health_refresh_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_set_value() {
        let mut config = Config::default();
        config
            .set_value("balancer_url", "http://localhost:8000/")
            .unwrap();
        assert_eq!(config.balancer_url, "http://localhost:8000");

        config.set_value("locale", "es").unwrap();
        assert_eq!(config.locale, Locale::Es);

        config.set_value("no_color", "yes").unwrap();
        assert!(config.no_color);

        assert!(config.set_value("api_timeout_ms", "soon").is_err());
        assert!(config.set_value("nonexistent", "1").is_err());
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("vk.conf");

        let mut config = Config::default();
        config.site_url = "https://share.example.com".to_string();
        config.health_refresh_secs = 15;
        save_config_to(&config, &path).await.unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.site_url, "https://share.example.com");
        assert_eq!(loaded.health_refresh_secs, 15);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let loaded = load_config_from(&dir.path().join("absent.conf")).unwrap();
        assert_eq!(loaded.api_timeout_ms, Config::default().api_timeout_ms);
    }
}
