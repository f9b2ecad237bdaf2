//
// src/scheduler/results.rs
//

use crate::checker::CheckOutcome;
use crate::probe::{Quality, UNREACHABLE};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Latest latency per configured host, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct LatestResults {
    hosts: Vec<String>,
    latencies: HashMap<String, i64>,
    checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostStatus {
    pub host: String,
    pub latency_ms: i64,
    pub quality: Quality,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub any_reachable: bool,
    pub checked_at: Option<DateTime<Utc>>,
    pub hosts: Vec<HostStatus>,
}

impl LatestResults {
    pub fn new(hosts: &[String]) -> Self {
        let mut results = Self::default();
        results.reconcile(hosts);
        results
    }

    /// Added hosts start unknown (-1), removed hosts drop out, the rest keep
    /// their last value.
    pub fn reconcile(&mut self, hosts: &[String]) {
        let latencies = hosts
            .iter()
            .map(|host| {
                let latency = self.latencies.get(host).copied().unwrap_or(UNREACHABLE);
                (host.clone(), latency)
            })
            .collect();

        self.hosts = hosts.to_vec();
        self.latencies = latencies;
    }

    /// Hosts that are not configured any more are ignored.
    pub fn apply(&mut self, outcome: &CheckOutcome, checked_at: DateTime<Utc>) {
        for result in &outcome.results {
            if let Some(latency) = self.latencies.get_mut(&result.host) {
                *latency = result.latency_ms();
            }
        }
        self.checked_at = Some(checked_at);
    }

    pub fn get(&self, host: &str) -> i64 {
        self.latencies.get(host).copied().unwrap_or(UNREACHABLE)
    }

    pub fn any_reachable(&self) -> bool {
        self.latencies.values().any(|latency| *latency >= 0)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            any_reachable: self.any_reachable(),
            checked_at: self.checked_at,
            hosts: self
                .hosts
                .iter()
                .map(|host| {
                    let latency_ms = self.get(host);
                    HostStatus {
                        host: host.clone(),
                        latency_ms,
                        quality: Quality::from_latency(latency_ms),
                    }
                })
                .collect(),
        }
    }
}
