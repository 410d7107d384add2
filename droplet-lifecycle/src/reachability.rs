//! Management-port reachability gate
//!
//! A droplet reported `active` is only scheduled; the bootstrap script may
//! still be running. The agent accepting a connection on the management port
//! is the real readiness signal.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::error::Result;
use crate::poller::{wait_for, OnAbsent, PollPolicy};

/// Opens (and immediately releases) a test connection.
///
/// One dialer is built per process and handed to the provider; it stands in
/// for whatever network path reaches the droplets (public IP, VPN, tunnel).
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, host: &str, port: u16) -> io::Result<()>;
}

/// Plain TCP connect with a per-attempt bound
#[derive(Debug, Clone)]
pub struct TcpDialer {
    connect_timeout: Duration,
}

impl TcpDialer {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for TcpDialer {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, host: &str, port: u16) -> io::Result<()> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;
        drop(stream);
        Ok(())
    }
}

pub struct ReachabilityGate {
    dialer: Arc<dyn Dialer>,
    policy: PollPolicy,
}

impl ReachabilityGate {
    pub fn new(dialer: Arc<dyn Dialer>, policy: PollPolicy) -> Self {
        Self { dialer, policy }
    }

    /// Block until one test connection succeeds, or time out
    pub async fn wait_for_reachable(&self, host: &str, port: u16) -> Result<()> {
        let address = format!("{}:{}", host, port);
        let dialer = &self.dialer;
        let dial_address = &address;

        wait_for(
            "wait-reachable",
            &address,
            self.policy,
            OnAbsent::Fail,
            move || async move {
                match dialer.dial(host, port).await {
                    Ok(()) => Ok(true),
                    Err(e) => {
                        tracing::trace!(address = %dial_address, "Dial failed: {}", e);
                        Ok(false)
                    }
                }
            },
            |reachable| *reachable,
        )
        .await?;

        tracing::debug!(address = %address, "Management port reachable");
        Ok(())
    }
}
