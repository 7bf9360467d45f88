//! Stub scan handlers

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use auditor_core::domain::scan::{
    PortProbeStrategy, PortScanResult, ScanContext, ScanExecutionError, ScanHandler, ScanOptions,
    ScanResult, ScanType, ScanValidationError, SubdomainResult, TechStackResult,
};

/// What a stub handler does when executed
#[derive(Clone)]
pub enum Behavior {
    Succeed,
    Fail(String),
    Panic,
    Sleep(Duration),
    /// Wait for a permit on the gate, then succeed
    Gated(Arc<Semaphore>),
    /// Return a result of another scan type
    WrongVariant,
}

pub struct StubHandler {
    pub scan_type: ScanType,
    pub behavior: Behavior,
}

impl StubHandler {
    pub fn new(scan_type: ScanType, behavior: Behavior) -> Arc<dyn ScanHandler> {
        Arc::new(Self {
            scan_type,
            behavior,
        })
    }
}

pub fn sample_result(scan_type: ScanType) -> ScanResult {
    match scan_type {
        ScanType::PortScan => ScanResult::PortScan(PortScanResult {
            open_ports: BTreeSet::from([22, 443]),
            services: BTreeMap::from([(22, "ssh".to_string()), (443, "https".to_string())]),
            total_scanned: 12,
            strategy: PortProbeStrategy::Connect,
        }),
        ScanType::TechStack => ScanResult::TechStack(TechStackResult {
            web_server: Some("nginx".to_string()),
            ..Default::default()
        }),
        _ => ScanResult::Subdomain(SubdomainResult {
            subdomains: BTreeSet::from(["api.example.com".to_string(), "www.example.com".to_string()]),
            live_subdomains: BTreeSet::from(["www.example.com".to_string()]),
        }),
    }
}

#[async_trait]
impl ScanHandler for StubHandler {
    fn scan_type(&self) -> ScanType {
        self.scan_type
    }

    fn validate(&self, target: &str, options: &ScanOptions) -> Result<(), ScanValidationError> {
        if target.contains(' ') {
            return Err(ScanValidationError::invalid_target(target, "contains whitespace"));
        }
        if options.ports.as_deref() == Some("bad") {
            return Err(ScanValidationError::InvalidPortSpec("bad".to_string()));
        }
        Ok(())
    }

    async fn execute(&self, _context: &ScanContext) -> Result<ScanResult, ScanExecutionError> {
        match &self.behavior {
            Behavior::Succeed => {}
            Behavior::Fail(target) => {
                return Err(ScanExecutionError::InvalidTarget(target.clone()));
            }
            Behavior::Panic => panic!("handler blew up at src/internal.rs:42"),
            Behavior::Sleep(duration) => tokio::time::sleep(*duration).await,
            Behavior::Gated(gate) => {
                let permit = gate.acquire().await.expect("gate closed");
                permit.forget();
            }
            Behavior::WrongVariant => {
                return Ok(sample_result(if self.scan_type == ScanType::TechStack {
                    ScanType::PortScan
                } else {
                    ScanType::TechStack
                }));
            }
        }
        Ok(sample_result(self.scan_type))
    }
}
