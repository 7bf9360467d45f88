//! Recon use cases: adapter fan-out followed by aggregation

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use auditor_core::domain::scan::{
    PortScanResult, ScanContext, ScanExecutionError, SubdomainResult, TechStackResult,
};

use crate::application::aggregator::{merge_ports, merge_subdomains, merge_tech};
use crate::domain::{Fingerprinter, LivenessProbe, PortProber, SubdomainSource, run_adapter};

/// Share of the subdomain budget available to enumeration
const ENUMERATION_SHARE: f64 = 0.5;

/// Share of the port-scan budget available to the primary prober; the
/// remainder is kept for the connect fallback
const PRIMARY_PROBE_SHARE: f64 = 0.6;

/// Enumerate subdomains from several sources, then probe each unique name once
pub struct EnumerateSubdomainsUseCase {
    sources: Vec<Arc<SubdomainSource>>,
    default_sources: Vec<String>,
    liveness: Arc<LivenessProbe>,
    source_timeout: Duration,
    max_concurrent_probes: usize,
}

impl EnumerateSubdomainsUseCase {
    pub fn new(
        sources: Vec<Arc<SubdomainSource>>,
        default_sources: Vec<String>,
        liveness: Arc<LivenessProbe>,
        source_timeout: Duration,
        max_concurrent_probes: usize,
    ) -> Self {
        Self {
            sources,
            default_sources,
            liveness,
            source_timeout,
            max_concurrent_probes: max_concurrent_probes.max(1),
        }
    }

    /// Names of every source this use case can run
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    fn selected_sources(&self, context: &ScanContext) -> Vec<Arc<SubdomainSource>> {
        let requested = match &context.options.sources {
            Some(names) if !names.is_empty() => names,
            _ => &self.default_sources,
        };

        self.sources
            .iter()
            .filter(|source| requested.iter().any(|name| name == source.name()))
            .cloned()
            .collect()
    }

    #[instrument(skip_all, fields(job_id = %context.job_id, domain = %domain))]
    pub async fn execute(
        &self,
        domain: &str,
        context: &ScanContext,
    ) -> Result<SubdomainResult, ScanExecutionError> {
        let sources = self.selected_sources(context);
        // Enumeration may use at most half of the budget; liveness gets the rest
        let deadline = context
            .adapter_deadline(self.source_timeout)
            .min(context.stage_deadline(ENUMERATION_SHARE));
        debug!(source_count = sources.len(), "Running subdomain sources");

        let outcomes = join_all(
            sources
                .iter()
                .map(|source| run_adapter(source.as_ref(), domain, &context.options, deadline)),
        )
        .await;

        let subdomains = merge_subdomains(domain, outcomes)?;
        debug!(candidates = subdomains.len(), "Probing candidate liveness");

        // Names not probed by the cutoff are reported as not live
        let cutoff = context.work_deadline();
        let live_subdomains: BTreeSet<String> = futures::stream::iter(subdomains.iter().cloned())
            .map(|host| async move {
                if Instant::now() >= cutoff {
                    return None;
                }
                let live = run_adapter(self.liveness.as_ref(), &host, &context.options, cutoff)
                    .await
                    .unwrap_or(false);
                live.then_some(host)
            })
            .buffer_unordered(self.max_concurrent_probes)
            .filter_map(|host| async move { host })
            .collect()
            .await;

        info!(
            subdomains = subdomains.len(),
            live = live_subdomains.len(),
            "Subdomain enumeration finished"
        );

        Ok(SubdomainResult {
            subdomains,
            live_subdomains,
        })
    }
}

/// Probe ports with the primary prober, falling back to TCP connect
pub struct ScanPortsUseCase {
    primary: Arc<PortProber>,
    fallback: Arc<PortProber>,
}

impl ScanPortsUseCase {
    pub fn new(primary: Arc<PortProber>, fallback: Arc<PortProber>) -> Self {
        Self { primary, fallback }
    }

    #[instrument(skip_all, fields(job_id = %context.job_id, host = %host))]
    pub async fn execute(
        &self,
        host: &str,
        context: &ScanContext,
    ) -> Result<PortScanResult, ScanExecutionError> {
        let primary_deadline = context.stage_deadline(PRIMARY_PROBE_SHARE);
        let primary = run_adapter(self.primary.as_ref(), host, &context.options, primary_deadline).await;

        let fallback = match &primary {
            Err(e) if e.is_degradable() => {
                warn!(
                    prober = self.primary.name(),
                    error = %e,
                    "Primary port prober failed, falling back to {}",
                    self.fallback.name()
                );
                Some(
                    run_adapter(self.fallback.as_ref(), host, &context.options, context.work_deadline())
                        .await,
                )
            }
            _ => None,
        };

        let result = merge_ports(primary, fallback)?;
        info!(
            open = result.open_ports.len(),
            scanned = result.total_scanned,
            strategy = ?result.strategy,
            "Port scan finished"
        );
        Ok(result)
    }
}

/// Fetch a web target and match it against the signature table
pub struct FingerprintUseCase {
    fingerprinter: Arc<Fingerprinter>,
    fetch_timeout: Duration,
}

impl FingerprintUseCase {
    pub fn new(fingerprinter: Arc<Fingerprinter>, fetch_timeout: Duration) -> Self {
        Self {
            fingerprinter,
            fetch_timeout,
        }
    }

    #[instrument(skip_all, fields(job_id = %context.job_id, url = %url))]
    pub async fn execute(
        &self,
        url: &str,
        context: &ScanContext,
    ) -> Result<TechStackResult, ScanExecutionError> {
        let deadline = context.adapter_deadline(self.fetch_timeout);
        let outcome = run_adapter(self.fingerprinter.as_ref(), url, &context.options, deadline).await;

        let result = merge_tech([outcome])?;
        info!(
            cms = ?result.cms,
            technologies = result.technologies.len(),
            "Fingerprint finished"
        );
        Ok(result)
    }
}
