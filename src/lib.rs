// src/lib.rs
pub mod checker;
pub mod config;
pub mod history;
pub mod metrics;
pub mod probe;
pub mod retry;
pub mod scheduler;
pub mod server;

pub use checker::{CancelSignal, CheckOutcome, ConfigError, ConnectivityChecker, HostConfig};
pub use history::{HistoryPoint, HistoryStore};
pub use probe::{HostProber, ProbeResult, ProbeTransport, UNREACHABLE};
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerState, StatusSnapshot, TickReport};
