//! Configuration loading for Skein.
//!
//! Settings live in a single TOML file, `$SKEIN_CONFIG` if set, otherwise
//! `<config_dir>/skein/config.toml`. A missing file yields defaults; a file
//! that exists but does not parse is an error, never silently ignored.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Stock media provider settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaSettings {
    /// Provider API key. Empty means the media capability is unavailable.
    pub api_key: String,
    /// Override the provider base URL (tests, proxies).
    pub base_url: Option<String>,
}

/// Retry tuning for the engine's resilience wrapper.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub media: MediaSettings,
    pub retry: RetrySettings,
}

/// Path of the active config file, if one can be determined.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("SKEIN_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("skein").join("config.toml"))
}

/// Load the configuration, falling back to defaults when no file exists.
pub fn load() -> Result<AppConfig, ConfigError> {
    let Some(path) = config_path() else {
        tracing::warn!("no config directory available; using default configuration");
        return Ok(AppConfig::default());
    };
    if !path.exists() {
        tracing::warn!(path = %path.display(), "config file not found; using defaults");
        return Ok(AppConfig::default());
    }
    load_from(&path)
}

fn load_from(path: &std::path::Path) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
