// src/probe/result.rs
use serde::Serialize;
use std::fmt;

/// Latency sentinel for "unreachable" or "unknown".
pub const UNREACHABLE: i64 = -1;

/// Outcome of probing a single host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub host: String,
    pub success: bool,
    /// Only meaningful when `success` is true.
    pub roundtrip_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Excellent,
    Good,
    Fair,
    Slow,
    VerySlow,
    Unreachable,
}

impl ProbeResult {
    pub fn reachable(host: impl Into<String>, roundtrip_ms: u64) -> Self {
        Self {
            host: host.into(),
            success: true,
            roundtrip_ms,
        }
    }

    pub fn unreachable(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            success: false,
            roundtrip_ms: 0,
        }
    }

    /// Round trip in milliseconds, or [`UNREACHABLE`].
    pub fn latency_ms(&self) -> i64 {
        if self.success {
            i64::try_from(self.roundtrip_ms).unwrap_or(i64::MAX)
        } else {
            UNREACHABLE
        }
    }

    pub fn quality(&self) -> Quality {
        Quality::from_latency(self.latency_ms())
    }
}

impl Quality {
    pub fn from_latency(latency_ms: i64) -> Self {
        match latency_ms {
            l if l < 0 => Quality::Unreachable,
            l if l < 50 => Quality::Excellent,
            l if l < 100 => Quality::Good,
            l if l < 200 => Quality::Fair,
            l if l < 500 => Quality::Slow,
            _ => Quality::VerySlow,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Excellent => "excellent",
            Quality::Good => "good",
            Quality::Fair => "fair",
            Quality::Slow => "slow",
            Quality::VerySlow => "very slow",
            Quality::Unreachable => "unreachable",
        }
    }
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            write!(f, "{} ms ({})", self.roundtrip_ms, self.quality().as_str())
        } else {
            f.write_str("unreachable")
        }
    }
}
