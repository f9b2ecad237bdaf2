// src/probe/transport.rs
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use surge_ping::{Client, Config, PingIdentifier, PingSequence, ICMP};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        source: std::io::Error,
    },

    #[error("Failed to create ICMP socket: {0}")]
    Socket(std::io::Error),

    #[error("Echo failed: {0}")]
    Echo(#[from] surge_ping::SurgeError),

    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),
}

/// The network probe primitive: one echo request to one host.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn send(&self, host: &str, timeout: Duration) -> Result<Duration, ProbeError>;

    fn name(&self) -> &'static str;
}

/// ICMP echo through `surge-ping`.
///
/// A client is created per send, so a host whose socket cannot be opened only
/// fails its own probe.
#[derive(Debug, Default)]
pub struct IcmpTransport;

impl IcmpTransport {
    pub fn new() -> Self {
        Self
    }
}

async fn resolve_host(host: &str) -> Result<IpAddr, ProbeError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let resolve_err = |source| ProbeError::Resolve {
        host: host.to_string(),
        source,
    };

    let mut addrs = tokio::net::lookup_host(format!("{host}:0"))
        .await
        .map_err(resolve_err)?;
    addrs.next().map(|addr| addr.ip()).ok_or_else(|| {
        resolve_err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no addresses found",
        ))
    })
}

#[async_trait]
impl ProbeTransport for IcmpTransport {
    async fn send(&self, host: &str, timeout: Duration) -> Result<Duration, ProbeError> {
        let ip = resolve_host(host).await?;

        let client = match ip {
            IpAddr::V4(_) => Client::new(&Config::default()),
            IpAddr::V6(_) => Client::new(&Config::builder().kind(ICMP::V6).build()),
        }
        .map_err(ProbeError::Socket)?;

        let mut pinger = client.pinger(ip, PingIdentifier(rand::random())).await;
        pinger.timeout(timeout);

        let (_, rtt) = pinger.ping(PingSequence(0), &[0; 8]).await?;
        Ok(rtt)
    }

    fn name(&self) -> &'static str {
        "icmp"
    }
}
