// src/probe/mod.rs
mod prober;
mod result;
mod transport;

pub use prober::HostProber;
pub use result::{ProbeResult, Quality, UNREACHABLE};
pub use transport::{IcmpTransport, ProbeError, ProbeTransport};

#[cfg(test)]
pub(crate) use transport::mock;
