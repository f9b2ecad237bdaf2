// src/metrics/collector.rs
use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Probe metrics
    pub probe_attempts_total: IntCounterVec,
    pub host_latency_ms: IntGaugeVec,
    pub host_reachable: IntGaugeVec,

    // Check metrics
    pub checks_total: IntCounterVec,
    pub ticks_dropped_total: IntCounter,
    pub check_duration_seconds: Histogram,

    // Aggregate status
    pub internet_reachable: IntGauge,
    pub hosts_configured: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let probe_attempts_total = IntCounterVec::new(
            Opts::new("netcheck_probe_attempts_total", "Probe attempts by outcome"),
            &["host", "outcome"],
        )?;
        registry.register(Box::new(probe_attempts_total.clone()))?;

        let host_latency_ms = IntGaugeVec::new(
            Opts::new(
                "netcheck_host_latency_ms",
                "Latest round trip per host in milliseconds (-1=unreachable)",
            ),
            &["host"],
        )?;
        registry.register(Box::new(host_latency_ms.clone()))?;

        let host_reachable = IntGaugeVec::new(
            Opts::new(
                "netcheck_host_reachable",
                "Host reachability (1=reachable, 0=unreachable)",
            ),
            &["host"],
        )?;
        registry.register(Box::new(host_reachable.clone()))?;

        let checks_total = IntCounterVec::new(
            Opts::new("netcheck_checks_total", "Connectivity checks by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(checks_total.clone()))?;

        let ticks_dropped_total = IntCounter::new(
            "netcheck_ticks_dropped_total",
            "Ticks skipped because a check was still in flight",
        )?;
        registry.register(Box::new(ticks_dropped_total.clone()))?;

        let check_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "netcheck_check_duration_seconds",
            "Wall time of a full multi-host check",
        ))?;
        registry.register(Box::new(check_duration_seconds.clone()))?;

        let internet_reachable = IntGauge::new(
            "netcheck_internet_reachable",
            "Whether any host was reachable on the last check",
        )?;
        registry.register(Box::new(internet_reachable.clone()))?;

        let hosts_configured =
            IntGauge::new("netcheck_hosts_configured", "Number of configured hosts")?;
        registry.register(Box::new(hosts_configured.clone()))?;

        Ok(Self {
            probe_attempts_total,
            host_latency_ms,
            host_reachable,
            checks_total,
            ticks_dropped_total,
            check_duration_seconds,
            internet_reachable,
            hosts_configured,
        })
    }

    /// `failed` attempts preceded the final one, which succeeded if `success`.
    pub fn record_probe(&self, host: &str, failed: u32, success: bool) {
        if failed > 0 {
            self.probe_attempts_total
                .with_label_values(&[host, "failure"])
                .inc_by(u64::from(failed));
        }
        if success {
            self.probe_attempts_total
                .with_label_values(&[host, "success"])
                .inc();
        }
    }

    pub fn update_host(&self, host: &str, latency_ms: i64) {
        self.host_latency_ms
            .with_label_values(&[host])
            .set(latency_ms);
        self.host_reachable
            .with_label_values(&[host])
            .set(i64::from(latency_ms >= 0));
    }

    pub fn forget_host(&self, host: &str) {
        let _ = self.host_latency_ms.remove_label_values(&[host]);
        let _ = self.host_reachable.remove_label_values(&[host]);
        for outcome in ["success", "failure"] {
            let _ = self.probe_attempts_total.remove_label_values(&[host, outcome]);
        }
    }

    pub fn record_check(&self, any_reachable: bool, duration: Duration) {
        self.checks_total.with_label_values(&["completed"]).inc();
        self.check_duration_seconds.observe(duration.as_secs_f64());
        self.internet_reachable.set(i64::from(any_reachable));
    }

    pub fn record_cancelled_check(&self) {
        self.checks_total.with_label_values(&["cancelled"]).inc();
    }

    pub fn record_dropped_tick(&self) {
        self.ticks_dropped_total.inc();
    }

    pub fn update_host_count(&self, total: usize) {
        self.hosts_configured.set(total as i64);
    }
}

// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
