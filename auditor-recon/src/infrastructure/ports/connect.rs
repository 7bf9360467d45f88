//! TCP-connect fallback prober

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, instrument};

use auditor_core::domain::scan::{PortProbeStrategy, ScanOptions};

use crate::domain::{AdapterError, PortProbeOutcome, ToolAdapter, fallback_ports, requested_ports};
use crate::infrastructure::remaining_until;

/// Connects to each port of a restricted list; an accepted connection means open
pub struct TcpConnectProber {
    connect_timeout: Duration,
    max_concurrent: usize,
    port_limit: usize,
}

impl TcpConnectProber {
    pub fn new(connect_timeout: Duration, max_concurrent: usize, port_limit: usize) -> Self {
        Self {
            connect_timeout,
            max_concurrent: max_concurrent.max(1),
            port_limit,
        }
    }

    async fn resolve(host: &str, deadline: Instant) -> Option<IpAddr> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Some(ip);
        }

        match tokio::time::timeout_at(deadline, tokio::net::lookup_host((host, 0))).await {
            Ok(Ok(mut addrs)) => addrs.next().map(|addr| addr.ip()),
            _ => None,
        }
    }

    async fn is_open(&self, addr: SocketAddr, deadline: Instant) -> bool {
        let timeout = remaining_until(deadline, self.connect_timeout);
        matches!(
            tokio::time::timeout(timeout, TcpStream::connect(addr)).await,
            Ok(Ok(_))
        )
    }
}

#[async_trait]
impl ToolAdapter for TcpConnectProber {
    type Output = PortProbeOutcome;

    fn name(&self) -> &str {
        "tcp_connect"
    }

    #[instrument(skip_all, fields(adapter = "tcp_connect", host = %host))]
    async fn run(
        &self,
        host: &str,
        options: &ScanOptions,
        deadline: Instant,
    ) -> Result<PortProbeOutcome, AdapterError> {
        let requested = requested_ports(options).map_err(|e| AdapterError::invalid_target(e.to_string()))?;
        let ports = fallback_ports(&requested, self.port_limit);
        let mut outcome = PortProbeOutcome::empty(PortProbeStrategy::Connect, ports.len());

        let Some(ip) = Self::resolve(host, deadline).await else {
            debug!("Host did not resolve, no ports probed as open");
            return Ok(outcome);
        };

        outcome.open_ports = futures::stream::iter(ports)
            .map(|port| async move {
                self.is_open(SocketAddr::new(ip, port), deadline)
                    .await
                    .then_some(port)
            })
            .buffer_unordered(self.max_concurrent)
            .filter_map(|port| async move { port })
            .collect()
            .await;

        debug!(
            scanned = outcome.scanned,
            open = outcome.open_ports.len(),
            "TCP connect probe finished"
        );
        Ok(outcome)
    }
}
