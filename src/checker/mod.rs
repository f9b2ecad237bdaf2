// src/checker/mod.rs
mod cancel;
mod checker;
mod host_config;

pub use cancel::CancelSignal;
pub use checker::{CheckOutcome, ConnectivityChecker};
pub use host_config::{ConfigError, HostConfig};
