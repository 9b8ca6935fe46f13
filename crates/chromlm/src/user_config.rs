//! Process configuration: where the analysis service lives, where records
//! are kept and how aggressively requests are throttled.
//!
//! Layers, lowest precedence first: built-in defaults, the TOML file at
//! [`UserConfig::default_config_path`] (optional), then `CHROMLM_*`
//! environment variables (`CHROMLM_ENDPOINT`, `CHROMLM_HISTORY_CAP`, ...).

use std::path::{Path, PathBuf};
use std::time::Duration;

use chromlm_client::{AnalyzeHttpConfig, DEFAULT_ANALYZE_URL};
use chromlm_error::{Error, Result};
use chromlm_io::DEFAULT_HISTORY_CAP;
use serde::{Deserialize, Serialize};
use url::Url;

pub const ENV_PREFIX: &str = "CHROMLM";
pub const DEFAULT_COOLDOWN_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// `None` resolves to the platform data directory.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    /// Minimum gap between two network requests for the same post on one surface.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_endpoint() -> String {
    DEFAULT_ANALYZE_URL.to_string()
}

fn default_history_cap() -> usize {
    DEFAULT_HISTORY_CAP
}

fn default_cooldown_ms() -> u64 {
    DEFAULT_COOLDOWN_MS
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            storage_dir: None,
            history_cap: default_history_cap(),
            cooldown_ms: default_cooldown_ms(),
            request_timeout_secs: None,
        }
    }
}

impl UserConfig {
    /// Loads the layered configuration from the default file location.
    pub fn load() -> Result<Self> {
        Self::load_layered(Some(&Self::default_config_path()))
    }

    /// Loads defaults, then `path` if it exists, then the environment.
    pub fn load_layered(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("endpoint", DEFAULT_ANALYZE_URL)
            .and_then(|b| b.set_default("history_cap", DEFAULT_HISTORY_CAP as i64))
            .and_then(|b| b.set_default("cooldown_ms", DEFAULT_COOLDOWN_MS as i64))
            .map_err(config_err)?;
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .and_then(|cfg| cfg.try_deserialize::<UserConfig>())
            .map_err(config_err)
    }

    /// Default config.toml path: ~/.config/chromlm/config.toml
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chromlm")
            .join("config.toml")
    }

    pub fn resolved_storage_dir(&self) -> Result<PathBuf> {
        match &self.storage_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|d| d.join("chromlm"))
                .ok_or_else(|| Error::Config("no data directory available; set storage_dir".into())),
        }
    }

    pub fn endpoint_url(&self) -> Result<Url> {
        Url::parse(&self.endpoint)
            .map_err(|e| Error::Config(format!("invalid endpoint `{}`: {e}", self.endpoint)))
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn http_config(&self) -> Result<AnalyzeHttpConfig> {
        let cfg = AnalyzeHttpConfig::new(self.endpoint_url()?);
        Ok(match self.request_timeout_secs {
            Some(secs) => cfg.with_timeout(Duration::from_secs(secs)),
            None => cfg,
        })
    }
}

fn config_err(err: config::ConfigError) -> Error {
    Error::Config(err.to_string())
}
