// src/scheduler/scheduler.rs
use super::results::{LatestResults, StatusSnapshot};
use crate::checker::{CancelSignal, CheckOutcome, ConnectivityChecker, HostConfig};
use crate::history::{HistoryPoint, HistoryStore};
use crate::metrics::MetricsCollector;
use crate::probe::ProbeTransport;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

const TICK_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Checking,
    Cancelling,
}

/// Published once per completed tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    pub checked_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub outcome: CheckOutcome,
}

#[derive(Debug)]
enum Command {
    CheckNow,
    Reload(HostConfig),
    Shutdown,
}

struct Shared {
    checker: Arc<ConnectivityChecker>,
    history: Arc<HistoryStore>,
    latest: RwLock<LatestResults>,
    state: watch::Sender<SchedulerState>,
    ticks: broadcast::Sender<Arc<TickReport>>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Shared {
    fn set_state(&self, state: SchedulerState) {
        self.state.send_replace(state);
    }
}

struct InFlight {
    tick: u64,
    cancel: CancelSignal,
    started: Instant,
    handle: JoinHandle<Option<CheckOutcome>>,
}

/// Drives the checker on a fixed period, one check at a time.
pub struct Scheduler {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedReceiver<Command>,
    transport: &'static str,
    next_tick: u64,
    last_reachable: Option<bool>,
}

/// Cloneable access to a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
}

fn new_ticker(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

async fn wait_for(inflight: &mut Option<InFlight>) -> Result<Option<CheckOutcome>, JoinError> {
    match inflight {
        Some(running) => (&mut running.handle).await,
        None => std::future::pending().await,
    }
}

impl Scheduler {
    pub fn new(
        config: HostConfig,
        transport: Arc<dyn ProbeTransport>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> (Self, SchedulerHandle) {
        if let Some(metrics) = &metrics {
            metrics.update_host_count(config.hosts().len());
        }

        let transport_name = transport.name();
        let latest = LatestResults::new(config.hosts());
        let checker = Arc::new(ConnectivityChecker::new(
            config,
            transport,
            metrics.clone(),
        ));
        let (state, _) = watch::channel(SchedulerState::Idle);
        let (ticks, _) = broadcast::channel(TICK_CHANNEL_CAPACITY);
        let (tx, rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            checker,
            history: Arc::new(HistoryStore::new()),
            latest: RwLock::new(latest),
            state,
            ticks,
            metrics,
        });

        let scheduler = Self {
            shared: shared.clone(),
            commands: rx,
            transport: transport_name,
            next_tick: 0,
            last_reachable: None,
        };
        let handle = SchedulerHandle {
            shared,
            commands: tx,
        };

        (scheduler, handle)
    }

    /// Runs until [`SchedulerHandle::shutdown`] is called or every handle is
    /// dropped. The first tick fires immediately.
    pub async fn run(mut self) {
        let config = self.shared.checker.config();
        let mut ticker = new_ticker(config.check_interval());
        let mut inflight: Option<InFlight> = None;

        info!(
            "Starting scheduler: {} hosts every {:?} via {}",
            config.hosts().len(),
            config.check_interval(),
            self.transport
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.begin_tick(&mut inflight),
                joined = wait_for(&mut inflight) => {
                    if let Some(done) = inflight.take() {
                        self.finish_tick(done, joined).await;
                    }
                }
                command = self.commands.recv() => match command {
                    Some(Command::CheckNow) => self.begin_tick(&mut inflight),
                    Some(Command::Reload(config)) => {
                        self.cancel_inflight(&mut inflight).await;
                        ticker = new_ticker(config.check_interval());
                        self.apply_config(config).await;
                    }
                    Some(Command::Shutdown) | None => {
                        self.cancel_inflight(&mut inflight).await;
                        break;
                    }
                },
            }
        }

        info!("Scheduler shut down");
    }

    fn begin_tick(&mut self, inflight: &mut Option<InFlight>) {
        if let Some(running) = inflight {
            debug!(tick = running.tick, "Previous check still in flight, dropping tick");
            if let Some(metrics) = &self.shared.metrics {
                metrics.record_dropped_tick();
            }
            return;
        }

        self.next_tick += 1;
        let tick = self.next_tick;
        let cancel = CancelSignal::new();
        let checker = self.shared.checker.clone();
        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { checker.try_check(&cancel).await })
        };

        self.shared.set_state(SchedulerState::Checking);
        *inflight = Some(InFlight {
            tick,
            cancel,
            started: Instant::now(),
            handle,
        });
    }

    async fn finish_tick(
        &mut self,
        done: InFlight,
        joined: Result<Option<CheckOutcome>, JoinError>,
    ) {
        let tick = done.tick;
        let outcome = match joined {
            Ok(Some(outcome)) => outcome,
            Ok(None) => {
                debug!(tick, "Checker busy, tick dropped");
                self.shared.set_state(SchedulerState::Idle);
                return;
            }
            Err(e) => {
                error!(tick, "Check task failed: {}", e);
                self.shared.set_state(SchedulerState::Idle);
                return;
            }
        };

        // one logical timestamp for every host of the tick
        let now = Instant::now();
        let checked_at = Utc::now();
        for result in &outcome.results {
            self.shared
                .history
                .record_at(&result.host, result.latency_ms(), now);
            if let Some(metrics) = &self.shared.metrics {
                metrics.update_host(&result.host, result.latency_ms());
            }
        }
        self.shared.latest.write().await.apply(&outcome, checked_at);

        let reachable = outcome.results.iter().filter(|r| r.success).count();
        match (self.last_reachable, outcome.any_reachable) {
            (Some(false) | None, true) => info!("Internet is reachable"),
            (Some(true) | None, false) => warn!("Internet is unreachable"),
            _ => {}
        }
        self.last_reachable = Some(outcome.any_reachable);

        let elapsed = done.started.elapsed();
        debug!(
            tick,
            elapsed_ms = elapsed.as_millis() as u64,
            "Check complete: {}/{} hosts reachable",
            reachable,
            outcome.results.len()
        );

        let report = Arc::new(TickReport {
            tick,
            checked_at,
            elapsed,
            outcome,
        });
        // no subscribers is fine
        let _ = self.shared.ticks.send(report);
        self.shared.set_state(SchedulerState::Idle);
    }

    async fn cancel_inflight(&self, inflight: &mut Option<InFlight>) {
        let Some(running) = inflight.take() else {
            return;
        };

        self.shared.set_state(SchedulerState::Cancelling);
        running.cancel.cancel();
        match running.handle.await {
            Ok(_) => debug!(tick = running.tick, "Cancelled check discarded"),
            Err(e) => error!(tick = running.tick, "Cancelled check task failed: {}", e),
        }
        self.shared.set_state(SchedulerState::Idle);
    }

    async fn apply_config(&self, config: HostConfig) {
        let hosts = config.hosts().to_vec();
        let previous = self.shared.checker.config();

        if let Some(metrics) = &self.shared.metrics {
            for host in previous.hosts().iter().filter(|h| !hosts.contains(h)) {
                metrics.forget_host(host);
            }
        }

        info!(
            "Configuration reloaded: {} hosts every {:?}, timeout {:?}, {} attempts",
            hosts.len(),
            config.check_interval(),
            config.timeout(),
            config.attempts()
        );

        self.shared.checker.replace_config(config);
        self.shared.latest.write().await.reconcile(&hosts);
        self.shared.history.retain_hosts(&hosts);
    }
}

impl SchedulerHandle {
    /// Starts a check now unless one is already running.
    pub fn request_immediate_check(&self) {
        self.send(Command::CheckNow);
    }

    /// Cancels any running check, then continues with `config`.
    pub fn reload(&self, config: HostConfig) {
        self.send(Command::Reload(config));
    }

    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<TickReport>> {
        self.shared.ticks.subscribe()
    }

    pub fn history(&self, host: &str) -> Vec<HistoryPoint> {
        self.shared.history.chart(host)
    }

    pub fn history_store(&self) -> Arc<HistoryStore> {
        self.shared.history.clone()
    }

    pub async fn status(&self) -> StatusSnapshot {
        self.shared.latest.read().await.snapshot()
    }

    pub fn config(&self) -> Arc<HostConfig> {
        self.shared.checker.config()
    }

    pub fn state(&self) -> SchedulerState {
        *self.shared.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SchedulerState> {
        self.shared.state.subscribe()
    }

    fn send(&self, command: Command) {
        if let Err(e) = self.commands.send(command) {
            debug!("Scheduler not running, ignoring {:?}", e.0);
        }
    }
}
