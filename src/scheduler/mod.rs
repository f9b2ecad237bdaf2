// src/scheduler/mod.rs
mod results;
mod scheduler;

pub use results::{HostStatus, LatestResults, StatusSnapshot};
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerState, TickReport};
