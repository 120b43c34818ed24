//! Trainwatch configuration management
//! Handles loading and saving the YAML config file

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::monitor::grandtrain::DEFAULT_URL;
use crate::monitor::MonitorSettings;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "TRAINWATCH_CONFIG";

/// Trainwatch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Database path
    #[serde(default = "default_db_path")]
    pub database_path: String,

    /// City catalog JSON; the built-in catalog is used when unset
    #[serde(default)]
    pub cities_path: Option<String>,

    /// Ticket source settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Watcher settings
    #[serde(default)]
    pub monitor: MonitorConfig,
}

fn default_db_path() -> String {
    "~/.trainwatch/trainwatch.db".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            cities_path: None,
            source: SourceConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

/// Ticket source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Watcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    /// Watch forms even when price tracking was declined
    #[serde(default)]
    pub track_all_forms: bool,
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            track_all_forms: false,
        }
    }
}

impl MonitorConfig {
    pub fn settings(&self) -> MonitorSettings {
        MonitorSettings {
            // A zero period would make the interval timer panic
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            track_all_forms: self.track_all_forms,
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Config {
    /// Load config from the default location or specified path
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = Self::config_path(path)?;

        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Config::default();
            config.save(path)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config = Self::from_yaml(&raw)?;

        debug!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).context("Failed to parse config file")
    }

    /// Save config to the default location
    pub fn save(&self, path: Option<&str>) -> Result<()> {
        let config_path = Self::config_path(path)?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(&self)?;
        fs::write(&config_path, content).context("Failed to write config file")?;

        info!("Saved config to {:?}", config_path);
        Ok(())
    }

    /// Get the config file path
    fn config_path(path: Option<&str>) -> Result<PathBuf> {
        // Check env override first
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(env_path));
        }

        if let Some(p) = path {
            return Ok(PathBuf::from(p));
        }

        let home = dirs::home_dir().context("Cannot find home directory")?;
        Ok(home.join(".trainwatch").join("config.yml"))
    }

    /// Resolve database path (expand ~)
    pub fn resolve_db_path(&self) -> Result<PathBuf> {
        expand_home(&self.database_path)
    }

    pub fn resolve_cities_path(&self) -> Result<Option<PathBuf>> {
        self.cities_path.as_deref().map(expand_home).transpose()
    }
}

fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix('~') {
        Some(rest) => {
            let home = dirs::home_dir().context("Cannot find home directory")?;
            Ok(home.join(rest.trim_start_matches('/')))
        }
        None => Ok(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = Config::from_yaml("monitor:\n  poll_interval_ms: 500\n").unwrap();
        assert_eq!(config.monitor.poll_interval_ms, 500);
        assert_eq!(config.monitor.shutdown_timeout_secs, 5);
        assert!(!config.monitor.track_all_forms);
        assert_eq!(config.source, SourceConfig::default());
        assert_eq!(config.database_path, default_db_path());
        assert!(config.cities_path.is_none());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = Config {
            cities_path: Some("/tmp/cities.json".into()),
            ..Config::default()
        };
        let raw = serde_yaml::to_string(&config).unwrap();
        assert_eq!(Config::from_yaml(&raw).unwrap(), config);
    }

    #[test]
    fn test_monitor_settings() {
        let monitor = MonitorConfig {
            poll_interval_ms: 0,
            shutdown_timeout_secs: 1,
            track_all_forms: true,
        };
        let settings = monitor.settings();
        assert_eq!(settings.poll_interval, Duration::from_millis(1));
        assert!(settings.track_all_forms);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/var/db").unwrap(), PathBuf::from("/var/db"));
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_home("~/x/y.db").unwrap(), home.join("x/y.db"));
    }
}
