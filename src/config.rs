use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};

use crate::engine::DEFAULT_MARK_DELAY;

const APP_NAME: &str = "packman";
const CONFIG_FILE: &str = "config.json";

/// Default port for `packman serve`.
pub const DEFAULT_PORT: u16 = 17020;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file holding the checklist. Defaults to the platform data dir.
    pub database_path: Option<PathBuf>,
    /// Delay before an item mark lands, in milliseconds.
    pub mark_delay_ms: u64,
    /// Port for the HTTP API.
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            mark_delay_ms: DEFAULT_MARK_DELAY.as_millis() as u64,
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Load configuration from the user's config directory, then apply
    /// environment overrides. Returns defaults if the file doesn't exist or
    /// fails to parse.
    pub fn load() -> Self {
        let config = match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    fn try_load() -> Result<Self> {
        let config_path = get_config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse config file")
    }

    /// Apply `PACKMAN_DB`, `PACKMAN_MARK_DELAY_MS` and `PACKMAN_PORT`.
    /// Unparseable numbers are ignored.
    pub fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = var("PACKMAN_DB") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(ms) = var("PACKMAN_MARK_DELAY_MS").and_then(|s| s.parse().ok()) {
            self.mark_delay_ms = ms;
        }
        if let Some(port) = var("PACKMAN_PORT").and_then(|s| s.parse().ok()) {
            self.port = port;
        }
        self
    }

    pub fn mark_delay(&self) -> Duration {
        Duration::from_millis(self.mark_delay_ms)
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = Config::from_json(r#"{ "port": 9000 }"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.mark_delay_ms, 350);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        assert!(Config::from_json("{ port: ").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env = HashMap::from([
            ("PACKMAN_DB", "/tmp/p.db"),
            ("PACKMAN_MARK_DELAY_MS", "0"),
            ("PACKMAN_PORT", "not a port"),
        ]);
        let config =
            Config::default().with_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/p.db")));
        assert_eq!(config.mark_delay(), Duration::ZERO);
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
