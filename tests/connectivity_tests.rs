// tests/connectivity_tests.rs
use async_trait::async_trait;
use internet_checker::probe::ProbeError;
use internet_checker::{
    CancelSignal, ConnectivityChecker, HostConfig, HostProber, ProbeTransport, Scheduler,
    UNREACHABLE,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Host `a` answers in 20ms, `flaky` fails twice then answers in 80ms,
/// everything else is down.
#[derive(Default)]
struct LabNetwork {
    flaky_sends: AtomicU32,
    down_sends: AtomicU32,
}

#[async_trait]
impl ProbeTransport for LabNetwork {
    async fn send(&self, host: &str, _timeout: Duration) -> Result<Duration, ProbeError> {
        match host {
            "a" => Ok(Duration::from_millis(20)),
            "flaky" => {
                if self.flaky_sends.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ProbeError::Timeout(Duration::from_millis(100)))
                } else {
                    Ok(Duration::from_millis(80))
                }
            }
            _ => {
                self.down_sends.fetch_add(1, Ordering::SeqCst);
                Err(ProbeError::Socket(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "network unreachable",
                )))
            }
        }
    }

    fn name(&self) -> &'static str {
        "lab"
    }
}

fn host_config(hosts: &[&str], attempts: u32) -> HostConfig {
    HostConfig::new(
        hosts.iter().copied(),
        Duration::from_millis(200),
        attempts,
        Duration::from_secs(1),
    )
    .unwrap()
}

#[tokio::test]
async fn test_any_reachable_host_means_online() {
    let network = Arc::new(LabNetwork::default());
    let checker = ConnectivityChecker::new(host_config(&["a", "b"], 3), network.clone(), None);

    let outcome = checker.check(&CancelSignal::new()).await;

    assert!(outcome.any_reachable);
    let expected: HashMap<String, i64> =
        [("a".to_string(), 20), ("b".to_string(), UNREACHABLE)].into();
    assert_eq!(outcome.latency_map(), expected);
    assert_eq!(network.down_sends.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retries_until_third_attempt() {
    let network = Arc::new(LabNetwork::default());
    let prober = HostProber::new(network.clone(), None);

    let result = prober
        .probe("flaky", Duration::from_millis(200), 3, &CancelSignal::new())
        .await;

    assert!(result.success);
    assert_eq!(result.latency_ms(), 80);
    assert_eq!(network.flaky_sends.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_cancelled_check_reports_every_host_unreachable() {
    let network = Arc::new(LabNetwork::default());
    let checker = ConnectivityChecker::new(host_config(&["a", "b"], 3), network.clone(), None);
    let cancel = CancelSignal::new();
    cancel.cancel();

    let outcome = checker.check(&cancel).await;

    assert!(!outcome.any_reachable);
    assert_eq!(outcome.results.len(), 2);
    assert!(outcome.results.iter().all(|r| r.latency_ms() == UNREACHABLE));
    assert_eq!(network.down_sends.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_feeds_history_and_status() {
    let network = Arc::new(LabNetwork::default());
    let (scheduler, handle) = Scheduler::new(host_config(&["a", "b"], 1), network, None);
    let mut ticks = handle.subscribe();
    let task = tokio::spawn(scheduler.run());

    let first = ticks.recv().await.unwrap();
    let second = ticks.recv().await.unwrap();
    assert_eq!(second.tick, first.tick + 1);

    let chart = handle.history("a");
    assert_eq!(chart.len(), 2);
    assert!(chart.iter().all(|point| point.latency_ms == 20));
    assert!(chart[0].seconds_ago >= chart[1].seconds_ago);
    assert_eq!(handle.history_store().latest("b"), UNREACHABLE);

    let status = handle.status().await;
    assert!(status.any_reachable);
    assert_eq!(status.hosts.len(), 2);

    handle.shutdown();
    task.await.unwrap();
}
