//! Scan handler implementations

use std::sync::Arc;

use async_trait::async_trait;

use auditor_core::config::ReconConfig;
use auditor_core::domain::scan::{
    PortScanMode, ScanContext, ScanExecutionError, ScanHandler, ScanOptions, ScanResult, ScanType,
    ScanValidationError,
};

use crate::application::{EnumerateSubdomainsUseCase, FingerprintUseCase, ScanPortsUseCase};
use crate::domain::{
    SubdomainSource, domain_from_target, host_from_target, requested_ports, web_url_from_target,
};
use crate::infrastructure::{
    CommandSource, CrtShSource, DnsWordlistSource, HttpFingerprinter, HttpLivenessProbe,
    NmapProber, TcpConnectProber,
};

/// Subdomain enumeration with liveness probing
pub struct SubdomainScanModule {
    use_case: Arc<EnumerateSubdomainsUseCase>,
}

impl SubdomainScanModule {
    pub fn new(use_case: EnumerateSubdomainsUseCase) -> Self {
        Self {
            use_case: Arc::new(use_case),
        }
    }

    pub fn with_config(config: &ReconConfig) -> Self {
        let sources: Vec<Arc<SubdomainSource>> = vec![
            Arc::new(CrtShSource::new(&config.crtsh_base_url, &config.user_agent)),
            Arc::new(DnsWordlistSource::new(
                config.dns_wordlist.clone(),
                config.max_concurrent_probes,
            )),
            Arc::new(CommandSource::subfinder(&config.subfinder_executable)),
            Arc::new(CommandSource::amass(&config.amass_executable)),
            Arc::new(CommandSource::sublist3r(&config.sublist3r_executable)),
        ];
        let liveness = Arc::new(HttpLivenessProbe::new(
            config.liveness_timeout(),
            &config.user_agent,
        ));

        Self::new(EnumerateSubdomainsUseCase::new(
            sources,
            config.subdomain_sources.clone(),
            liveness,
            config.source_timeout(),
            config.max_concurrent_probes,
        ))
    }
}

#[async_trait]
impl ScanHandler for SubdomainScanModule {
    fn scan_type(&self) -> ScanType {
        ScanType::Subdomain
    }

    fn validate(&self, target: &str, options: &ScanOptions) -> Result<(), ScanValidationError> {
        domain_from_target(target)?;

        let known = self.use_case.source_names();
        if let Some(sources) = &options.sources
            && let Some(unknown) = sources.iter().find(|s| !known.contains(&s.as_str()))
        {
            return Err(ScanValidationError::UnknownSource(unknown.clone()));
        }
        Ok(())
    }

    async fn execute(&self, context: &ScanContext) -> Result<ScanResult, ScanExecutionError> {
        let domain = domain_from_target(&context.target)
            .map_err(|e| ScanExecutionError::InvalidTarget(e.to_string()))?;

        let result = self.use_case.execute(&domain, context).await?;
        Ok(ScanResult::Subdomain(result))
    }
}

/// TCP port scan with nmap and a TCP-connect fallback
pub struct PortScanModule {
    use_case: Arc<ScanPortsUseCase>,
}

impl PortScanModule {
    pub fn new(use_case: ScanPortsUseCase) -> Self {
        Self {
            use_case: Arc::new(use_case),
        }
    }

    pub fn with_config(config: &ReconConfig) -> Self {
        Self::new(ScanPortsUseCase::new(
            Arc::new(NmapProber::new(&config.nmap_executable)),
            Arc::new(TcpConnectProber::new(
                config.connect_timeout(),
                config.max_concurrent_connects,
                config.fallback_port_limit,
            )),
        ))
    }
}

#[async_trait]
impl ScanHandler for PortScanModule {
    fn scan_type(&self) -> ScanType {
        ScanType::PortScan
    }

    fn validate(&self, target: &str, options: &ScanOptions) -> Result<(), ScanValidationError> {
        host_from_target(target)?;
        if options.port_mode == PortScanMode::Custom {
            requested_ports(options)?;
        }
        Ok(())
    }

    async fn execute(&self, context: &ScanContext) -> Result<ScanResult, ScanExecutionError> {
        let host = host_from_target(&context.target)
            .map_err(|e| ScanExecutionError::InvalidTarget(e.to_string()))?;

        let result = self.use_case.execute(&host, context).await?;
        Ok(ScanResult::PortScan(result))
    }
}

/// Technology stack fingerprinting
pub struct TechStackModule {
    use_case: Arc<FingerprintUseCase>,
}

impl TechStackModule {
    pub fn new(use_case: FingerprintUseCase) -> Self {
        Self {
            use_case: Arc::new(use_case),
        }
    }

    pub fn with_config(config: &ReconConfig) -> Self {
        Self::new(FingerprintUseCase::new(
            Arc::new(HttpFingerprinter::new(&config.user_agent)),
            config.fingerprint_timeout(),
        ))
    }
}

#[async_trait]
impl ScanHandler for TechStackModule {
    fn scan_type(&self) -> ScanType {
        ScanType::TechStack
    }

    fn validate(&self, target: &str, _options: &ScanOptions) -> Result<(), ScanValidationError> {
        web_url_from_target(target).map(|_| ())
    }

    async fn execute(&self, context: &ScanContext) -> Result<ScanResult, ScanExecutionError> {
        let url = web_url_from_target(&context.target)
            .map_err(|e| ScanExecutionError::InvalidTarget(e.to_string()))?;

        let result = self.use_case.execute(url.as_str(), context).await?;
        Ok(ScanResult::TechStack(result))
    }
}

/// The three recon handlers, built from configuration
pub fn default_handlers(config: &ReconConfig) -> Vec<Arc<dyn ScanHandler>> {
    vec![
        Arc::new(SubdomainScanModule::with_config(config)),
        Arc::new(PortScanModule::with_config(config)),
        Arc::new(TechStackModule::with_config(config)),
    ]
}
