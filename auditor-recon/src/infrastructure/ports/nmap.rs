//! SYN scan through the nmap binary

use std::collections::{BTreeMap, BTreeSet};
use std::process::Stdio;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, error, instrument};

use auditor_core::domain::scan::{PortProbeStrategy, ScanOptions};

use crate::domain::{
    AdapterError, PortProbeOutcome, ToolAdapter, compact_ports, requested_ports,
};
use crate::infrastructure::classify_spawn_error;

static OPEN_PORT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)/tcp\s+open\s+(\S+)").expect("Invalid nmap port regex"));

/// Primary port prober: `nmap -sS -T4 -p <ports> <host>`
pub struct NmapProber {
    executable: String,
}

impl NmapProber {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

/// Open ports and their service column from nmap's normal output.
///
/// Ports outside `probed` are ignored.
fn parse_open_ports(stdout: &str, probed: &BTreeSet<u16>) -> BTreeMap<u16, String> {
    stdout
        .lines()
        .filter_map(|line| OPEN_PORT_LINE.captures(line.trim()))
        .filter_map(|caps| {
            let port: u16 = caps.get(1)?.as_str().parse().ok()?;
            let service = caps.get(2)?.as_str().to_string();
            probed.contains(&port).then_some((port, service))
        })
        .collect()
}

#[async_trait]
impl ToolAdapter for NmapProber {
    type Output = PortProbeOutcome;

    fn name(&self) -> &str {
        "nmap"
    }

    #[instrument(skip_all, fields(adapter = "nmap", host = %host))]
    async fn run(
        &self,
        host: &str,
        options: &ScanOptions,
        deadline: Instant,
    ) -> Result<PortProbeOutcome, AdapterError> {
        let ports = requested_ports(options).map_err(|e| AdapterError::invalid_target(e.to_string()))?;
        if host.starts_with('-') {
            return Err(AdapterError::invalid_target(format!("refusing target {}", host)));
        }

        let mut cmd = Command::new(&self.executable);
        cmd.arg("-sS")
            .arg("-T4")
            .arg("-p")
            .arg(compact_ports(&ports))
            .arg(host)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!(command = ?cmd, "Executing nmap");

        let output = tokio::time::timeout_at(deadline, cmd.output())
            .await
            .map_err(|_| AdapterError::timeout("nmap"))?
            .map_err(|e| classify_spawn_error(&self.executable, &e))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            error!(
                exit_code = output.status.code(),
                stderr = %stderr.trim(),
                "nmap execution failed"
            );
            if stderr.contains("root privileges") || stderr.contains("Operation not permitted") {
                return Err(AdapterError::tool_unavailable(
                    "nmap needs elevated privileges for SYN scans",
                ));
            }
            return Err(AdapterError::unknown(format!("nmap exited with {}", output.status)));
        }

        let probed: BTreeSet<u16> = ports.iter().copied().collect();
        let services = parse_open_ports(&String::from_utf8_lossy(&output.stdout), &probed);

        Ok(PortProbeOutcome {
            strategy: PortProbeStrategy::Syn,
            open_ports: services.keys().copied().collect(),
            services,
            scanned: ports.len(),
        })
    }
}
