use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const API_KEY_ENV: &str = "EXCHANGE_RATE_API_KEY";

fn default_base_url() -> String {
    "https://v6.exchangerate-api.com/v6/".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_anchor_currency() -> String {
    "USD".to_string()
}

fn default_auto_save() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ApiConfig {
    pub key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_anchor_currency")]
    pub anchor_currency: String,
}

impl ApiConfig {
    pub fn with_key(key: &str) -> Self {
        Self {
            key: key.to_string(),
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            anchor_currency: default_anchor_currency(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HistoryConfig {
    #[serde(default = "default_auto_save")]
    pub auto_save: bool,
    pub file_path: Option<String>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            auto_save: default_auto_save(),
            file_path: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl AppConfig {
    /// Loads the default config file, falling back to `EXCHANGE_RATE_API_KEY`
    /// when no file exists.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            return Self::load_from_path(&config_path);
        }

        debug!(
            "No config at {}, trying environment",
            config_path.display()
        );
        Self::from_env().with_context(|| {
            format!(
                "No configuration found. Run `fxconv setup` to create {} or set {}",
                config_path.display(),
                API_KEY_ENV
            )
        })
    }

    pub fn from_env() -> Result<Self> {
        let key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .with_context(|| format!("{API_KEY_ENV} is not set"))?;
        Ok(Self {
            api: ApiConfig::with_key(&key),
            history: HistoryConfig::default(),
        })
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "fxconv", "fxconv")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    /// Snapshot location: the configured path, or `history.json` in the data dir.
    pub fn history_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.history.file_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("com", "fxconv", "fxconv")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().join("history.json"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
