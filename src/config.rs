//! Configuration loading.
//!
//! ```toml
//! host = "irc.libera.chat"
//! port = 6697
//! secure = true
//! nick = "logbot"
//! channels = ["#rust", "#secret hunter2"]
//! get_stats = true
//! stats_interval = 5
//! ```

use std::env::{self, VarError};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::warn;

use crate::codec::CodecKind;
use crate::error::ConfigError;
use crate::isupport::Network;

/// A password that never shows up in `Debug` output or logs.
#[derive(Clone)]
pub struct Secret(SecretString);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(\"...\")")
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Secret::new)
    }
}

/// A configured channel: `"#chan"` or `"#chan key"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelEntry<'a> {
    pub name: &'a str,
    pub key: Option<&'a str>,
}

impl<'a> ChannelEntry<'a> {
    pub fn parse(entry: &'a str) -> Option<Self> {
        let mut parts = entry.split_whitespace();
        let name = parts.next()?;
        Some(Self {
            name,
            key: parts.next(),
        })
    }

    /// The `JOIN` line for this channel.
    pub fn join_line(&self) -> String {
        match self.key {
            Some(key) => format!("JOIN {} {}", self.name, key),
            None => format!("JOIN {}", self.name),
        }
    }
}

/// Ingestor configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// IRC server hostname.
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connect over TLS.
    #[serde(default)]
    pub secure: bool,
    #[serde(default = "default_identity")]
    pub nick: String,
    #[serde(default = "default_identity")]
    pub user: String,
    #[serde(default = "default_identity")]
    pub real: String,
    /// Server password, sent as `PASS`.
    #[serde(default)]
    pub password: Option<Secret>,
    /// Environment variable to read the server password from when
    /// `password` is unset.
    #[serde(default)]
    pub password_env: Option<String>,
    /// Channels to join, each optionally followed by its key.
    pub channels: Vec<String>,
    /// Queue every message instead of only channel PRIVMSG/NOTICE.
    #[serde(default)]
    pub catch_all: bool,
    /// Periodically count channel users with NAMES.
    #[serde(default)]
    pub get_stats: bool,
    /// Minutes between NAMES cycles.
    #[serde(default = "default_stats_interval")]
    pub stats_interval: u64,
    #[serde(default)]
    pub codec: CodecKind,
    /// Force a network instead of detecting it.
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    6667
}

fn default_identity() -> String {
    "logstash".to_string()
}

fn default_stats_interval() -> u64 {
    5
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(invalid("host", "must not be empty"));
        }
        if self.nick.trim().is_empty() {
            return Err(invalid("nick", "must not be empty"));
        }
        if self.channels.iter().filter_map(|c| ChannelEntry::parse(c)).count() == 0 {
            return Err(invalid("channels", "at least one channel is required"));
        }
        if self.stats_interval == 0 {
            return Err(invalid("stats_interval", "must be at least one minute"));
        }
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms", "must be greater than zero"));
        }
        Ok(())
    }

    /// `host:port`, as stamped on records.
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The configured channels with blank entries skipped.
    pub fn channel_entries(&self) -> impl Iterator<Item = ChannelEntry<'_>> {
        self.channels.iter().filter_map(|c| ChannelEntry::parse(c))
    }

    /// Bare channel names, without keys.
    pub fn channel_names(&self) -> Vec<String> {
        self.channel_entries().map(|c| c.name.to_owned()).collect()
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval.saturating_mul(60))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The forced network, or [`Network::Unknown`] to detect it.
    pub fn network(&self) -> Network {
        self.network
            .as_deref()
            .map(Network::from_name)
            .unwrap_or_default()
    }

    /// Whether every parsed message is queued, not just channel chat.
    pub fn subscribe_all(&self) -> bool {
        self.catch_all || self.get_stats
    }

    /// The server password, if one is configured and readable.
    ///
    /// An unreadable source counts as no password.
    pub fn resolve_password(&self) -> Option<Secret> {
        if let Some(password) = &self.password {
            return Some(password.clone());
        }

        let var = self.password_env.as_deref()?;
        match env::var(var) {
            Ok(value) if !value.is_empty() => Some(Secret::new(value)),
            Ok(_) => {
                warn!(
                    var = %var,
                    "password environment variable is empty, continuing without password"
                );
                None
            }
            Err(VarError::NotPresent) => {
                warn!(
                    var = %var,
                    "password environment variable is not set, continuing without password"
                );
                None
            }
            Err(VarError::NotUnicode(_)) => {
                warn!(
                    var = %var,
                    "password environment variable is not unicode, continuing without password"
                );
                None
            }
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
