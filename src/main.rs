// src/main.rs
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use internet_checker::{
    config::{self, Config},
    metrics::MetricsRegistry,
    probe::IcmpTransport,
    scheduler::{Scheduler, SchedulerHandle},
    server::{RequestHandler, ServerBuilder},
};

const DEFAULT_CONFIG_PATH: &str = "settings.ini";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("internet_checker=info".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    let config_path = PathBuf::from(
        std::env::args()
            .nth(1)
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()),
    );
    let config = read_config(&config_path)?;
    let host_config = config.host_config()?;

    let metrics_registry = Arc::new(MetricsRegistry::new()?);

    let (scheduler, handle) = Scheduler::new(
        host_config,
        Arc::new(IcmpTransport::new()),
        Some(metrics_registry.collector()),
    );
    let scheduler_task = tokio::spawn(scheduler.run());
    tokio::spawn(log_ticks(handle.subscribe()));

    #[cfg(unix)]
    tokio::spawn(reload_on_hangup(config_path.clone(), handle.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server_task = if config.server.enabled {
        let handler = RequestHandler::new(handle.clone(), Some(metrics_registry.clone()));
        let mut shutdown_rx = shutdown_rx.clone();
        let server = ServerBuilder::new(config.server.listen).with_handler(handler);
        Some(tokio::spawn(async move {
            server
                .serve(async move {
                    let _ = shutdown_rx.wait_for(|stop| *stop).await;
                })
                .await
        }))
    } else {
        None
    };

    shutdown_signal().await;

    handle.shutdown();
    let _ = shutdown_tx.send(true);
    scheduler_task.await?;
    if let Some(task) = server_task {
        task.await??;
    }

    Ok(())
}

fn read_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    info!("Loading configuration from: {}", path.display());
    config::load_config(path)
}

async fn log_ticks(mut ticks: broadcast::Receiver<Arc<internet_checker::TickReport>>) {
    loop {
        match ticks.recv().await {
            Ok(report) => {
                for result in &report.outcome.results {
                    debug!(tick = report.tick, host = %result.host, "{}", result);
                }
                info!(
                    tick = report.tick,
                    "Internet {}",
                    if report.outcome.any_reachable { "online" } else { "offline" }
                );
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!("Tick log lagging, skipped {} reports", missed);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(unix)]
async fn reload_on_hangup(path: PathBuf, handle: SchedulerHandle) {
    let mut hangup = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            error!("Failed to install SIGHUP handler: {}", e);
            return;
        }
    };

    while hangup.recv().await.is_some() {
        info!("SIGHUP received, reloading {}", path.display());
        let reloaded = read_config(&path).and_then(|config| Ok(config.host_config()?));
        match reloaded {
            Ok(host_config) => handle.reload(host_config),
            Err(e) => error!("Keeping current configuration: {:#}", e),
        }
    }
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
