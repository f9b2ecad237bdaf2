// src/checker/host_config.rs
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("At least one host must be configured")]
    NoHosts,

    #[error("Check interval must be greater than zero")]
    ZeroInterval,

    #[error("Ping timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Ping attempts must be at least 1")]
    ZeroAttempts,
}

/// What to probe and how. Validated on construction, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    hosts: Vec<String>,
    timeout: Duration,
    attempts: u32,
    check_interval: Duration,
}

impl HostConfig {
    /// Blank and `#`-commented entries are skipped and duplicates collapsed,
    /// keeping first-seen order.
    pub fn new<I, S>(
        hosts: I,
        timeout: Duration,
        attempts: u32,
        check_interval: Duration,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for host in hosts {
            let host = host.as_ref().trim();
            if host.is_empty() || host.starts_with('#') {
                continue;
            }
            if !unique.iter().any(|h| h == host) {
                unique.push(host.to_string());
            }
        }

        if unique.is_empty() {
            return Err(ConfigError::NoHosts);
        }
        if check_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }

        Ok(Self {
            hosts: unique,
            timeout,
            attempts,
            check_interval,
        })
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }
}
