use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::monitor::query::DEFAULT_MARKETPLACE_URL;
use crate::monitor::scheduler::DEFAULT_POLL_INTERVAL_SECS;
use crate::scanner::ListingSelectors;

pub const DEFAULT_CONFIG_PATH: &str = "marketwatch.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub telegram_api_token: String,
    /// Chat that receives listing alerts.
    pub telegram_chat_id: String,
    pub polling_interval: u64,
    pub marketplace_url: String,
    pub request_timeout_secs: u64,
    pub dedup_notifications: bool,
    pub log_dir: String,
    pub log_level: String,
    pub selectors: ListingSelectors,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialConfig {
    telegram_api_token: Option<String>,
    telegram_chat_id: Option<String>,
    polling_interval: Option<u64>,
    marketplace_url: Option<String>,
    request_timeout_secs: Option<u64>,
    dedup_notifications: Option<bool>,
    log_dir: Option<String>,
    log_level: Option<String>,
    selectors: Option<ListingSelectors>,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Loads the optional TOML file, then lets environment variables
    /// (including those from `.env`) override it.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let path = Path::new(config_path.unwrap_or(DEFAULT_CONFIG_PATH));
        let file_config = if path.exists() {
            read_file(path)?
        } else {
            PartialConfig::default()
        };
        let env_config: PartialConfig = envy::from_env()?;

        merge(env_config, file_config)
    }

    pub fn with_interval_override(mut self, interval: Option<u64>) -> Result<Self, ConfigError> {
        if let Some(interval) = interval {
            self.polling_interval = interval;
        }
        self.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.polling_interval == 0 {
            return Err(ConfigError::Invalid(
                "polling_interval must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1 second".to_string(),
            ));
        }
        Ok(self)
    }
}

fn read_file(path: &Path) -> Result<PartialConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// Values from `primary` win over `fallback`.
fn merge(primary: PartialConfig, fallback: PartialConfig) -> Result<AppConfig, ConfigError> {
    let config = AppConfig {
        telegram_api_token: primary
            .telegram_api_token
            .or(fallback.telegram_api_token)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("TELEGRAM_API_TOKEN"))?,
        telegram_chat_id: primary
            .telegram_chat_id
            .or(fallback.telegram_chat_id)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("TELEGRAM_CHAT_ID"))?,
        polling_interval: primary
            .polling_interval
            .or(fallback.polling_interval)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        marketplace_url: primary
            .marketplace_url
            .or(fallback.marketplace_url)
            .unwrap_or_else(|| DEFAULT_MARKETPLACE_URL.to_string()),
        request_timeout_secs: primary
            .request_timeout_secs
            .or(fallback.request_timeout_secs)
            .unwrap_or_else(default_request_timeout_secs),
        dedup_notifications: primary
            .dedup_notifications
            .or(fallback.dedup_notifications)
            .unwrap_or(false),
        log_dir: primary
            .log_dir
            .or(fallback.log_dir)
            .unwrap_or_else(default_log_dir),
        log_level: primary
            .log_level
            .or(fallback.log_level)
            .unwrap_or_else(default_log_level),
        selectors: primary
            .selectors
            .or(fallback.selectors)
            .unwrap_or_default(),
    };
    config.validate()
}
