// Config file handling: where the file lives, what it contains and how a
// fresh one is written by `habits init`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HabitsError, Result};

/// Public Habitica API endpoint, used when the config file does not name one.
pub const API_ENDPOINT: &str = "https://habitica.com/api/v3";

/// Contents of `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub auth: Auth,
    /// Short names for task ids, e.g. `floss = "<uuid>"`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub alias: BTreeMap<String, String>,
    #[serde(default)]
    pub cron: CronConfig,
}

/// Credentials and endpoint. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Auth {
    pub api_user: String,
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CronConfig {
    /// Local hour (0-23) at which the Habitica day starts.
    #[serde(default)]
    pub day_start: u32,
}

fn default_base_url() -> String {
    API_ENDPOINT.to_string()
}

/// `<config dir>/habits`, e.g. `~/.config/habits` on Linux.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("habits")
}

/// Default location of the config file.
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// `<cache dir>/habits`, home of the HTTP cache and the cron marker.
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("habits")
}

impl Config {
    /// Read and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            HabitsError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        let cfg = Self::parse(&text)
            .map_err(|e| HabitsError::config(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), aliases = cfg.alias.len(), "loaded config");
        Ok(cfg)
    }

    /// Parse config text; credentials must be present and non-empty.
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let cfg: Config = toml::from_str(text).map_err(|e| e.message().to_string())?;
        if cfg.auth.api_user.trim().is_empty() {
            return Err("auth.api-user is empty".into());
        }
        if cfg.auth.api_key.trim().is_empty() {
            return Err("auth.api-key is empty".into());
        }
        if cfg.cron.day_start > 23 {
            return Err(format!(
                "cron.day-start must be between 0 and 23, got {}",
                cfg.cron.day_start
            ));
        }
        Ok(cfg)
    }

    /// Build a config holding only credentials.
    pub fn new(api_user: String, api_key: String) -> Self {
        Config {
            auth: Auth {
                api_user,
                api_key,
                base_url: default_base_url(),
            },
            alias: BTreeMap::new(),
            cron: CronConfig::default(),
        }
    }

    /// Write the config to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let text = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
