//! `~/.tdlink/config.toml`.
//!
//! ```toml
//! [client]
//! request_timeout_secs = 60
//! poll_timeout_secs = 2.0
//! listener_capacity = 1000
//! log_verbosity = 1
//!
//! [authorization]
//! settle_delay_ms = 1000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::client::{ClientOptions, DEFAULT_LISTENER_CAPACITY, DEFAULT_REQUEST_TIMEOUT};
use crate::router::{DEFAULT_POLL_TIMEOUT, RouterConfig};

/// How long the engine needs after reporting readiness before its local state is flushed.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub client: ClientSection,
    pub authorization: AuthorizationSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    pub request_timeout_secs: u64,
    pub poll_timeout_secs: f64,
    pub listener_capacity: usize,
    pub log_verbosity: Option<i32>,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT.as_secs_f64(),
            listener_capacity: DEFAULT_LISTENER_CAPACITY,
            log_verbosity: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthorizationSection {
    pub settle_delay_ms: u64,
}

impl Default for AuthorizationSection {
    fn default() -> Self {
        Self {
            settle_delay_ms: u64::try_from(DEFAULT_SETTLE_DELAY.as_millis()).unwrap_or(1000),
        }
    }
}

impl AuthorizationSection {
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Config {
    /// Load the user config. A missing file is not an error.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read config");
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };
        toml::from_str(&content).map_err(|err| {
            tracing::warn!(path = %path.display(), error = %err, "failed to parse config");
            ConfigError::Parse {
                path: path.to_path_buf(),
                source: err,
            }
        })
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        let options = ClientOptions::default()
            .with_request_timeout(Duration::from_secs(self.client.request_timeout_secs))
            .with_listener_capacity(self.client.listener_capacity);
        match self.client.log_verbosity {
            Some(level) => options.with_log_verbosity(level),
            None => options,
        }
    }

    /// Negative or non-finite poll timeouts fall back to the default.
    #[must_use]
    pub fn router_config(&self) -> RouterConfig {
        let poll_timeout = Duration::try_from_secs_f64(self.client.poll_timeout_secs)
            .unwrap_or(DEFAULT_POLL_TIMEOUT);
        RouterConfig::default().poll_timeout(poll_timeout)
    }
}

fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".tdlink").join("config.toml"))
}
