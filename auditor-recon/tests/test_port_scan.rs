//! Port scan handler with the nmap primary unavailable

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::time::Instant;
use uuid::Uuid;

use auditor_core::config::ReconConfig;
use auditor_core::domain::scan::{
    PortProbeStrategy, PortScanMode, ScanContext, ScanHandler, ScanOptions, ScanResult,
};
use auditor_recon::PortScanModule;
use auditor_recon::application::ScanPortsUseCase;
use auditor_recon::domain::{AdapterError, FAST_PORTS, PortProbeOutcome, ToolAdapter};

fn handler_without_nmap() -> PortScanModule {
    PortScanModule::with_config(&ReconConfig {
        nmap_executable: "definitely-not-installed-nmap".to_string(),
        connect_timeout_ms: 500,
        ..ReconConfig::default()
    })
}

fn context(target: &str, options: ScanOptions) -> ScanContext {
    ScanContext::new(Uuid::new_v4(), target, options, Duration::from_secs(20))
}

#[tokio::test]
async fn test_fast_scan_falls_back_to_connect() {
    let result = handler_without_nmap()
        .execute(&context("127.0.0.1", ScanOptions::default()))
        .await
        .unwrap();

    let ScanResult::PortScan(ports) = result else {
        panic!("unexpected result variant");
    };
    assert_eq!(ports.strategy, PortProbeStrategy::Connect);
    assert_eq!(ports.total_scanned, FAST_PORTS.len());
    assert!(ports.open_ports.iter().all(|p| FAST_PORTS.contains(p)));
    assert!(ports.total_scanned >= ports.open_ports.len());
}

#[tokio::test]
async fn test_custom_scan_finds_listening_port() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open_port = listener.local_addr().unwrap().port();
    let closed_port = {
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        probe.local_addr().unwrap().port()
    };

    let options = ScanOptions {
        port_mode: PortScanMode::Custom,
        ports: Some(format!("{},{}", open_port, closed_port)),
        ..Default::default()
    };

    let result = handler_without_nmap()
        .execute(&context("127.0.0.1", options))
        .await
        .unwrap();

    let ScanResult::PortScan(ports) = result else {
        panic!("unexpected result variant");
    };
    assert!(ports.open_ports.contains(&open_port));
    assert!(!ports.open_ports.contains(&closed_port));
    assert_eq!(ports.total_scanned, 2);
    assert!(ports.services.contains_key(&open_port));
    drop(listener);
}

#[tokio::test]
async fn test_url_target_is_reduced_to_host() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let options = ScanOptions {
        port_mode: PortScanMode::Custom,
        ports: Some(port.to_string()),
        ..Default::default()
    };

    let result = handler_without_nmap()
        .execute(&context("http://127.0.0.1/index.html", options))
        .await
        .unwrap();
    assert!(matches!(result, ScanResult::PortScan(p) if p.open_ports.contains(&port)));
}

/// Primary prober that never returns on its own
struct HangingProber;

#[async_trait]
impl ToolAdapter for HangingProber {
    type Output = PortProbeOutcome;

    fn name(&self) -> &str {
        "nmap"
    }

    async fn run(
        &self,
        _host: &str,
        _options: &ScanOptions,
        _deadline: Instant,
    ) -> Result<PortProbeOutcome, AdapterError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(PortProbeOutcome::empty(PortProbeStrategy::Syn, FAST_PORTS.len()))
    }
}

/// Fallback that answers immediately with port 22 open
struct InstantConnectProber;

#[async_trait]
impl ToolAdapter for InstantConnectProber {
    type Output = PortProbeOutcome;

    fn name(&self) -> &str {
        "tcp_connect"
    }

    async fn run(
        &self,
        _host: &str,
        _options: &ScanOptions,
        deadline: Instant,
    ) -> Result<PortProbeOutcome, AdapterError> {
        assert!(Instant::now() < deadline, "fallback started without any time left");
        let mut outcome = PortProbeOutcome::empty(PortProbeStrategy::Connect, FAST_PORTS.len());
        outcome.open_ports = BTreeSet::from([22]);
        Ok(outcome)
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_primary_leaves_time_for_fallback() {
    let handler = PortScanModule::new(ScanPortsUseCase::new(
        Arc::new(HangingProber),
        Arc::new(InstantConnectProber),
    ));
    let context = ScanContext::new(
        Uuid::new_v4(),
        "10.0.0.1",
        ScanOptions::default(),
        Duration::from_secs(90),
    );

    let result = tokio::time::timeout_at(context.deadline, handler.execute(&context))
        .await
        .expect("handler finished before the job deadline")
        .unwrap();

    let ScanResult::PortScan(ports) = result else {
        panic!("unexpected result variant");
    };
    assert_eq!(ports.strategy, PortProbeStrategy::Connect);
    assert_eq!(ports.open_ports, BTreeSet::from([22]));
    assert_eq!(ports.total_scanned, FAST_PORTS.len());
    assert_eq!(ports.services.get(&22).map(String::as_str), Some("ssh"));
}
