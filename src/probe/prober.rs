// src/probe/prober.rs
use super::result::ProbeResult;
use super::transport::ProbeTransport;
use crate::checker::CancelSignal;
use crate::metrics::MetricsCollector;
use crate::retry::{RetryConfig, RetryError, RetryStrategy};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Probes one host with bounded retries.
pub struct HostProber {
    transport: Arc<dyn ProbeTransport>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl HostProber {
    pub fn new(
        transport: Arc<dyn ProbeTransport>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self { transport, metrics }
    }

    /// Up to `attempts` echo requests, stopping at the first reply.
    ///
    /// Failures, timeouts and cancellation all come back as an unreachable
    /// result; nothing here is reported as an error.
    pub async fn probe(
        &self,
        host: &str,
        timeout: Duration,
        attempts: u32,
        cancel: &CancelSignal,
    ) -> ProbeResult {
        let strategy = RetryStrategy::new(RetryConfig {
            max_attempts: attempts,
            attempt_timeout: timeout,
        });

        let outcome = strategy
            .execute(cancel, |_| self.transport.send(host, timeout))
            .await;

        match outcome {
            Ok((rtt, attempt)) => {
                let roundtrip_ms = u64::try_from(rtt.as_millis()).unwrap_or(u64::MAX);
                debug!(host = %host, attempt, roundtrip_ms, "Probe succeeded");
                self.record(host, attempt - 1, true);
                ProbeResult::reachable(host, roundtrip_ms)
            }
            Err(error @ RetryError::Cancelled { .. }) => {
                debug!(host = %host, "Probe cancelled");
                self.record(host, error.attempts_made(), false);
                ProbeResult::unreachable(host)
            }
            Err(error) => {
                debug!(host = %host, %error, "Host unreachable");
                self.record(host, error.attempts_made(), false);
                ProbeResult::unreachable(host)
            }
        }
    }

    fn record(&self, host: &str, failed: u32, success: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_probe(host, failed, success);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::mock::{Reply, ScriptedTransport};
    use crate::probe::UNREACHABLE;

    fn prober(transport: Arc<ScriptedTransport>) -> HostProber {
        HostProber::new(transport, None)
    }

    #[tokio::test]
    async fn test_third_attempt_succeeds() {
        let transport = Arc::new(ScriptedTransport::new().script(
            "x",
            &[Reply::Fail, Reply::Fail, Reply::Ok(80)],
            Reply::Fail,
            Duration::ZERO,
        ));

        let result = prober(transport.clone())
            .probe("x", Duration::from_millis(500), 3, &CancelSignal::new())
            .await;

        assert!(result.success);
        assert_eq!(result.latency_ms(), 80);
        assert_eq!(transport.sends("x"), 3);
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let transport = Arc::new(ScriptedTransport::new().always("x", Reply::Ok(5)));

        let result = prober(transport.clone())
            .probe("x", Duration::from_millis(500), 4, &CancelSignal::new())
            .await;

        assert_eq!(result.latency_ms(), 5);
        assert_eq!(transport.sends("x"), 1);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_are_unreachable() {
        let transport = Arc::new(ScriptedTransport::new().always("x", Reply::Fail));

        let result = prober(transport.clone())
            .probe("x", Duration::from_millis(500), 4, &CancelSignal::new())
            .await;

        assert!(!result.success);
        assert_eq!(result.latency_ms(), UNREACHABLE);
        assert_eq!(transport.sends("x"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_attempts_time_out() {
        let transport = Arc::new(ScriptedTransport::new().script(
            "x",
            &[Reply::Hang],
            Reply::Ok(30),
            Duration::ZERO,
        ));

        let start = tokio::time::Instant::now();
        let result = prober(transport.clone())
            .probe("x", Duration::from_secs(1), 2, &CancelSignal::new())
            .await;

        assert_eq!(result.latency_ms(), 30);
        assert_eq!(transport.sends("x"), 2);
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_pending_attempt() {
        let transport = Arc::new(ScriptedTransport::new().always("x", Reply::Hang));
        let cancel = CancelSignal::new();
        let prober = Arc::new(prober(transport.clone()));

        let task = {
            let prober = prober.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                prober
                    .probe("x", Duration::from_secs(10), 3, &cancel)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        let cancelled_at = tokio::time::Instant::now();
        cancel.cancel();

        let result = task.await.unwrap();
        assert_eq!(result.latency_ms(), UNREACHABLE);
        assert_eq!(transport.sends("x"), 1);
        assert!(cancelled_at.elapsed() < Duration::from_secs(1));
    }
}
