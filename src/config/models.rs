// src/config/models.rs
use crate::checker::{ConfigError, HostConfig};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::warn;

const MAX_CHECK_INTERVAL_SECS: i64 = 60;
const MIN_PING_TIMEOUT_MS: i64 = 100;
const MAX_PING_ATTEMPTS: i64 = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub ping: PingConfig,

    #[serde(default)]
    pub hosts: HostList,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Seconds between checks.
    #[serde(
        default = "default_check_interval",
        deserialize_with = "lenient_check_interval"
    )]
    pub check_interval: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PingConfig {
    /// Per-attempt timeout in milliseconds.
    #[serde(default = "default_ping_timeout", deserialize_with = "lenient_ping_timeout")]
    pub timeout: i64,

    #[serde(default = "default_ping_attempts", deserialize_with = "lenient_ping_attempts")]
    pub attempts: i64,
}

/// Either a plain list or INI-style named entries (`host1 = ya.ru`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HostList {
    List(Vec<String>),
    Named(BTreeMap<String, String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

fn default_check_interval() -> i64 {
    1
}

fn default_ping_timeout() -> i64 {
    1000
}

fn default_ping_attempts() -> i64 {
    3
}

/// Integers arrive as numbers (JSON, TOML) or strings (INI, environment).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawInt {
    Int(i64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

/// Unparsable values fall back to `default` instead of failing the load.
fn lenient_int<'de, D>(deserializer: D, key: &str, default: i64) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match RawInt::deserialize(deserializer)? {
        RawInt::Int(value) => Some(value),
        RawInt::Text(text) => text.trim().parse().ok(),
        RawInt::Other(_) => None,
    };
    Ok(parsed.unwrap_or_else(|| {
        warn!("{} is not an integer, using {}", key, default);
        default
    }))
}

fn lenient_check_interval<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    lenient_int(deserializer, "general.check_interval", default_check_interval())
}

fn lenient_ping_timeout<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    lenient_int(deserializer, "ping.timeout", default_ping_timeout())
}

fn lenient_ping_attempts<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    lenient_int(deserializer, "ping.attempts", default_ping_attempts())
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9477))
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            check_interval: default_check_interval(),
        }
    }
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            timeout: default_ping_timeout(),
            attempts: default_ping_attempts(),
        }
    }
}

impl Default for HostList {
    fn default() -> Self {
        HostList::List(vec!["ya.ru".to_string(), "google.com".to_string()])
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_listen(),
        }
    }
}

impl HostList {
    /// Named entries come back ordered by their numeric suffix, so `host2`
    /// precedes `host10`; keys without one sort last, by name.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            HostList::List(hosts) => hosts.clone(),
            HostList::Named(hosts) => {
                let mut entries: Vec<_> = hosts.iter().collect();
                entries.sort_by(|(a, _), (b, _)| {
                    let rank = |key: &str| key_number(key).unwrap_or(u64::MAX);
                    (rank(a.as_str()), a).cmp(&(rank(b.as_str()), b))
                });
                entries.into_iter().map(|(_, host)| host.clone()).collect()
            }
        }
    }
}

fn key_number(key: &str) -> Option<u64> {
    let digits = key.len() - key.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    key[key.len() - digits..].parse().ok()
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.host_config().map(|_| ())
    }

    /// Zero values are rejected; anything else, negatives included, is
    /// clamped into range.
    pub fn host_config(&self) -> Result<HostConfig, ConfigError> {
        let interval = clamp_logged(
            "general.check_interval",
            self.general.check_interval,
            1,
            MAX_CHECK_INTERVAL_SECS,
        );
        let timeout = clamp_logged("ping.timeout", self.ping.timeout, MIN_PING_TIMEOUT_MS, i64::MAX);
        let attempts = clamp_logged(
            "ping.attempts",
            self.ping.attempts,
            1,
            MAX_PING_ATTEMPTS,
        );

        HostConfig::new(
            self.hosts.to_vec(),
            Duration::from_millis(timeout.unsigned_abs()),
            u32::try_from(attempts).unwrap_or_default(),
            Duration::from_secs(interval.unsigned_abs()),
        )
    }
}

fn clamp_logged(key: &str, value: i64, min: i64, max: i64) -> i64 {
    // zero passes through so HostConfig rejects it
    if value == 0 {
        return value;
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!("{} = {} out of range, using {}", key, value, clamped);
    }
    clamped
}
