//! Client configuration at `~/.mudlink/config.toml`.
//!
//! Engine tuning and storage locations. CLI flags always override config
//! file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use mudlink_client::settings::{DEFAULT_LOGIN_FORMAT, DEFAULT_SCROLLBACK_BYTES};
use mudlink_client::EngineSettings;

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub paths: PathsConfig,
}

/// Connection engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Scrollback ceiling per session in bytes (0 = unbounded).
    #[serde(default = "default_scrollback_bytes")]
    pub scrollback_bytes: usize,

    /// Keep-alive interval in seconds (0 = off).
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Pause before trying the fallback transport.
    #[serde(default = "default_fallback_delay_ms")]
    pub fallback_delay_ms: u64,

    /// Auto-login command; `{name}` and `{secret}` are substituted.
    #[serde(default = "default_login_format")]
    pub login_format: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scrollback_bytes: default_scrollback_bytes(),
            keepalive_secs: default_keepalive_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            fallback_delay_ms: default_fallback_delay_ms(),
            login_format: default_login_format(),
        }
    }
}

fn default_scrollback_bytes() -> usize {
    DEFAULT_SCROLLBACK_BYTES
}

fn default_keepalive_secs() -> u64 {
    240
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_fallback_delay_ms() -> u64 {
    1500
}

fn default_login_format() -> String {
    DEFAULT_LOGIN_FORMAT.to_string()
}

impl EngineConfig {
    pub fn to_settings(&self) -> EngineSettings {
        EngineSettings {
            scrollback_bytes: self.scrollback_bytes,
            keepalive_interval: Duration::from_secs(self.keepalive_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            fallback_delay: Duration::from_millis(self.fallback_delay_ms),
            login_format: self.login_format.clone(),
        }
    }
}

/// Storage locations. Unset entries live under `~/.mudlink/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    pub profile: Option<PathBuf>,
    pub secrets: Option<PathBuf>,
    pub logs: Option<PathBuf>,
}

/// Resolved storage locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub profile: PathBuf,
    pub secrets: PathBuf,
    pub logs: PathBuf,
}

impl PathsConfig {
    /// Fill in defaults relative to `home` and expand a leading `~/`.
    pub fn resolve(&self, home: &Path) -> Paths {
        let base = home.join(".mudlink");
        let pick = |configured: &Option<PathBuf>, fallback: PathBuf| match configured {
            Some(p) => expand_home(p, home),
            None => fallback,
        };
        Paths {
            profile: pick(&self.profile, base.join("profile.json")),
            secrets: pick(&self.secrets, base.join("secrets")),
            logs: pick(&self.logs, base.join("logs")),
        }
    }
}

fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// `~/.mudlink/config.toml`.
pub fn default_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(".mudlink").join("config.toml"))
}

impl Config {
    /// Load configuration from a TOML file, returning defaults if the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;

        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}
