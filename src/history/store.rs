// src/history/store.rs
use dashmap::DashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// How long samples are kept.
pub const RETENTION_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistorySample {
    pub at: Instant,
    pub latency_ms: i64,
}

/// One chart point relative to the time of the read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub seconds_ago: f64,
    pub latency_ms: i64,
}

/// Rolling per-host latency history.
///
/// Each host has its own oldest-first queue. Stale samples are dropped when
/// the queue is written and filtered out when it is read, so there is no
/// background sweep.
pub struct HistoryStore {
    queues: DashMap<String, VecDeque<HistorySample>>,
    retention: Duration,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::with_retention(RETENTION_WINDOW)
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            queues: DashMap::new(),
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn record(&self, host: &str, latency_ms: i64) {
        self.record_at(host, latency_ms, Instant::now());
    }

    pub fn record_at(&self, host: &str, latency_ms: i64, at: Instant) {
        let mut queue = self.queues.entry(host.to_string()).or_default();
        queue.push_back(HistorySample { at, latency_ms });

        while let Some(oldest) = queue.front() {
            if self.is_stale(oldest, at) {
                queue.pop_front();
            } else {
                break;
            }
        }
    }

    /// Samples inside the window, oldest first.
    pub fn samples_at(&self, host: &str, now: Instant) -> Vec<HistorySample> {
        self.queues
            .get(host)
            .map(|queue| {
                queue
                    .iter()
                    .filter(|sample| !self.is_stale(sample, now))
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn recent_samples(&self, host: &str) -> Vec<i64> {
        self.recent_samples_at(host, Instant::now())
    }

    pub fn recent_samples_at(&self, host: &str, now: Instant) -> Vec<i64> {
        self.samples_at(host, now)
            .into_iter()
            .map(|sample| sample.latency_ms)
            .collect()
    }

    /// Newest sample inside the window, or -1.
    pub fn latest(&self, host: &str) -> i64 {
        let now = Instant::now();
        self.queues
            .get(host)
            .and_then(|queue| {
                queue
                    .back()
                    .filter(|sample| !self.is_stale(sample, now))
                    .map(|sample| sample.latency_ms)
            })
            .unwrap_or(crate::probe::UNREACHABLE)
    }

    pub fn chart(&self, host: &str) -> Vec<HistoryPoint> {
        self.chart_at(host, Instant::now())
    }

    pub fn chart_at(&self, host: &str, now: Instant) -> Vec<HistoryPoint> {
        self.samples_at(host, now)
            .into_iter()
            .map(|sample| HistoryPoint {
                seconds_ago: now.saturating_duration_since(sample.at).as_secs_f64(),
                latency_ms: sample.latency_ms,
            })
            .collect()
    }

    /// Drops the queues of hosts not in `hosts`.
    pub fn retain_hosts(&self, hosts: &[String]) {
        self.queues.retain(|host, _| hosts.contains(host));
    }

    pub fn hosts(&self) -> Vec<String> {
        self.queues.iter().map(|entry| entry.key().clone()).collect()
    }

    fn is_stale(&self, sample: &HistorySample, now: Instant) -> bool {
        now.saturating_duration_since(sample.at) > self.retention
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_samples_outside_window_are_not_returned() {
        let store = HistoryStore::new();
        let t0 = Instant::now();

        store.record_at("x", 50, t0);
        store.record_at("x", 30, t0 + secs(70));

        assert_eq!(store.recent_samples_at("x", t0 + secs(75)), vec![30]);
    }

    #[test]
    fn test_record_evicts_stale_front() {
        let store = HistoryStore::new();
        let t0 = Instant::now();

        store.record_at("x", 1, t0);
        store.record_at("x", 2, t0 + secs(30));
        store.record_at("x", 3, t0 + secs(61));

        // t0 is still inside the window at t0+30, so only the write can have evicted it
        assert_eq!(store.recent_samples_at("x", t0 + secs(30)), vec![2, 3]);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let store = HistoryStore::new();
        let t0 = Instant::now();

        store.record_at("x", 10, t0);

        assert_eq!(store.recent_samples_at("x", t0 + secs(60)), vec![10]);
        assert!(store
            .recent_samples_at("x", t0 + secs(60) + Duration::from_millis(1))
            .is_empty());
    }

    #[test]
    fn test_hosts_are_independent() {
        let store = HistoryStore::new();
        let t0 = Instant::now();

        store.record_at("a", 1, t0);
        store.record_at("b", 2, t0 + secs(90));

        assert_eq!(store.recent_samples_at("a", t0 + secs(10)), vec![1]);
        assert_eq!(store.recent_samples_at("b", t0 + secs(90)), vec![2]);
        assert!(store.recent_samples_at("missing", t0).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_and_chart_follow_the_clock() {
        let store = HistoryStore::new();
        assert_eq!(store.latest("x"), -1);

        store.record("x", 40);
        tokio::time::advance(secs(5)).await;
        store.record("x", 25);
        tokio::time::advance(secs(1)).await;

        assert_eq!(store.latest("x"), 25);
        assert_eq!(store.recent_samples("x"), vec![40, 25]);
        let chart = store.chart("x");
        assert_eq!(chart.len(), 2);
        assert_eq!(chart[0].seconds_ago, 6.0);
        assert_eq!(chart[1], HistoryPoint { seconds_ago: 1.0, latency_ms: 25 });

        tokio::time::advance(secs(60)).await;
        assert_eq!(store.latest("x"), -1);
        assert!(store.chart("x").is_empty());
    }

    #[test]
    fn test_retain_hosts_drops_removed_queues() {
        let store = HistoryStore::new();
        store.record("a", 1);
        store.record("b", 2);

        store.retain_hosts(&["b".to_string()]);

        assert_eq!(store.hosts(), vec!["b".to_string()]);
    }

    proptest! {
        #[test]
        fn prop_reads_never_return_stale_samples(
            offsets in prop::collection::vec((0u64..300, -1i64..500), 0..40),
            query in 0u64..400,
        ) {
            let store = HistoryStore::new();
            let t0 = Instant::now();
            for (offset, latency) in &offsets {
                store.record_at("h", *latency, t0 + secs(*offset));
            }

            let now = t0 + secs(query);
            for sample in store.samples_at("h", now) {
                prop_assert!(now.saturating_duration_since(sample.at) <= RETENTION_WINDOW);
            }
        }

        #[test]
        fn prop_in_order_records_keep_every_fresh_sample(
            mut offsets in prop::collection::vec(0u64..300, 1..40),
        ) {
            offsets.sort_unstable();
            let store = HistoryStore::new();
            let t0 = Instant::now();
            for (i, offset) in offsets.iter().enumerate() {
                store.record_at("h", i as i64, t0 + secs(*offset));
            }

            let now = t0 + secs(*offsets.last().unwrap());
            let expected: Vec<i64> = offsets
                .iter()
                .enumerate()
                .filter(|(_, offset)| now - (t0 + secs(**offset)) <= RETENTION_WINDOW)
                .map(|(i, _)| i as i64)
                .collect();
            prop_assert_eq!(store.recent_samples_at("h", now), expected);
        }
    }
}
