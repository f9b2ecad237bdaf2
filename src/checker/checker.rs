// src/checker/checker.rs
use super::cancel::CancelSignal;
use super::host_config::HostConfig;
use crate::metrics::{MetricsCollector, Timer};
use crate::probe::{HostProber, ProbeResult, ProbeTransport};
use arc_swap::ArcSwap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

/// Results of one multi-host check, one entry per configured host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub any_reachable: bool,
    pub results: Vec<ProbeResult>,
}

impl CheckOutcome {
    fn from_results(results: Vec<ProbeResult>) -> Self {
        Self {
            any_reachable: results.iter().any(|r| r.success),
            results,
        }
    }

    pub fn latency_of(&self, host: &str) -> Option<i64> {
        self.results
            .iter()
            .find(|r| r.host == host)
            .map(ProbeResult::latency_ms)
    }

    pub fn latency_map(&self) -> HashMap<String, i64> {
        self.results
            .iter()
            .map(|r| (r.host.clone(), r.latency_ms()))
            .collect()
    }
}

pub struct ConnectivityChecker {
    config: ArcSwap<HostConfig>,
    prober: Arc<HostProber>,
    in_progress: AtomicBool,
    metrics: Option<Arc<MetricsCollector>>,
}

struct InProgress<'a>(&'a AtomicBool);

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ConnectivityChecker {
    pub fn new(
        config: HostConfig,
        transport: Arc<dyn ProbeTransport>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        let prober = Arc::new(HostProber::new(transport, metrics.clone()));

        Self {
            config: ArcSwap::from_pointee(config),
            prober,
            in_progress: AtomicBool::new(false),
            metrics,
        }
    }

    pub fn config(&self) -> Arc<HostConfig> {
        self.config.load_full()
    }

    /// Takes effect on the next check; a running check keeps its snapshot.
    pub fn replace_config(&self, config: HostConfig) {
        if let Some(metrics) = &self.metrics {
            metrics.update_host_count(config.hosts().len());
        }
        self.config.store(Arc::new(config));
    }

    pub fn is_checking(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Runs a check unless one is already running, in which case the request
    /// is dropped and `None` returned.
    pub async fn try_check(&self, cancel: &CancelSignal) -> Option<CheckOutcome> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Check already in progress, dropping request");
            return None;
        }
        let _guard = InProgress(&self.in_progress);

        Some(self.check(cancel).await)
    }

    /// Checks the hosts of the current configuration snapshot.
    pub async fn check(&self, cancel: &CancelSignal) -> CheckOutcome {
        let config = self.config.load_full();
        self.check_with(&config, cancel).await
    }

    /// Probes every host concurrently and waits for all of them.
    pub async fn check_with(&self, config: &HostConfig, cancel: &CancelSignal) -> CheckOutcome {
        let timer = Timer::new();
        let mut tasks = Vec::with_capacity(config.hosts().len());

        for host in config.hosts() {
            let prober = self.prober.clone();
            let host = host.clone();
            let cancel = cancel.clone();
            let (timeout, attempts) = (config.timeout(), config.attempts());

            tasks.push(tokio::spawn(async move {
                prober.probe(&host, timeout, attempts, &cancel).await
            }));
        }

        let joined = futures::future::join_all(tasks).await;

        let results: Vec<ProbeResult> = config
            .hosts()
            .iter()
            .zip(joined)
            .map(|(host, result)| match result {
                Ok(probe) => probe,
                Err(e) => {
                    error!(host = %host, "Probe task join error: {}", e);
                    ProbeResult::unreachable(host.as_str())
                }
            })
            .collect();

        let outcome = CheckOutcome::from_results(results);

        if let Some(metrics) = &self.metrics {
            if cancel.is_cancelled() {
                metrics.record_cancelled_check();
            } else {
                metrics.record_check(outcome.any_reachable, timer.elapsed());
            }
        }

        outcome
    }
}
