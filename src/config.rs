//! Configuration for service connections and task polling.
//!
//! # Example Configuration File
//!
//! ```toml
//! rhost = "https://192.168.1.100"
//! username = "root"
//! password = "calvin"
//! timeout_ms = 5000
//! accept_invalid_certs = true
//!
//! [poller]
//! default_poll_interval_ms = 1000
//! max_wait_ms = 600000
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

const ENV_PREFIX: &str = "TACKLEBOX_";

fn default_poll_interval() -> u64 {
    1_000
}

fn default_timeout() -> u64 {
    5_000
}

/// Task polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Delay between polls when the service sends no usable `Retry-After`.
    #[serde(default = "default_poll_interval")]
    pub default_poll_interval_ms: u64,

    /// Upper bound on the total time spent waiting for a task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wait_ms: Option<u64>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            default_poll_interval_ms: default_poll_interval(),
            max_wait_ms: None,
        }
    }
}

impl PollerConfig {
    /// Default poll interval. A configured `0` is raised to one
    /// millisecond so a misconfiguration never busy-polls.
    pub fn default_poll_interval(&self) -> Duration {
        Duration::from_millis(self.default_poll_interval_ms.max(1))
    }

    /// Maximum total wait, if bounded.
    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms.map(Duration::from_millis)
    }
}

/// Connection settings for a Redfish service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service address, with scheme.
    pub rhost: String,

    /// User name for Basic authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password for Basic authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// Skip TLS certificate verification (self-signed BMC certificates).
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Task polling settings.
    #[serde(default)]
    pub poller: PollerConfig,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("rhost", &self.rhost)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_ms", &self.timeout_ms)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("poller", &self.poller)
            .finish()
    }
}

impl ServiceConfig {
    /// Creates a configuration for `rhost` with defaults elsewhere.
    pub fn new(rhost: impl Into<String>) -> Self {
        Self {
            rhost: rhost.into(),
            username: None,
            password: None,
            timeout_ms: default_timeout(),
            accept_invalid_certs: false,
            poller: PollerConfig::default(),
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Into::into)
    }

    /// Serializes the configuration to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Loads configuration from `TACKLEBOX_*` environment variables.
    ///
    /// - `TACKLEBOX_RHOST` (required)
    /// - `TACKLEBOX_USER`, `TACKLEBOX_PASSWORD`
    /// - `TACKLEBOX_TIMEOUT_MS`
    /// - `TACKLEBOX_INSECURE` (`1`/`true`)
    /// - `TACKLEBOX_POLL_INTERVAL_MS`, `TACKLEBOX_MAX_WAIT_MS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(format!("{ENV_PREFIX}{name}")).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let rhost = lookup("RHOST")
            .ok_or_else(|| Error::Config(format!("{ENV_PREFIX}RHOST is not set")))?;
        let mut config = Self::new(rhost);
        config.username = lookup("USER");
        config.password = lookup("PASSWORD");
        if let Some(ms) = parse_number(&lookup, "TIMEOUT_MS")? {
            config.timeout_ms = ms;
        }
        if let Some(flag) = lookup("INSECURE") {
            config.accept_invalid_certs = matches!(flag.trim(), "1" | "true" | "yes");
        }
        if let Some(ms) = parse_number(&lookup, "POLL_INTERVAL_MS")? {
            config.poller.default_poll_interval_ms = ms;
        }
        config.poller.max_wait_ms = parse_number(&lookup, "MAX_WAIT_MS")?;
        Ok(config)
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn parse_number(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<u64>> {
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|e| Error::Config(format!("{ENV_PREFIX}{name}: {e}")))
        })
        .transpose()
}
