//! Wordlist-driven DNS enumerator

use async_trait::async_trait;
use futures::StreamExt;
use tokio::time::Instant;
use tracing::{debug, instrument};

use auditor_core::domain::scan::ScanOptions;

use crate::domain::{AdapterError, SubdomainCandidates, ToolAdapter};

/// Resolves `{word}.{domain}` for every word and keeps the names that resolve
pub struct DnsWordlistSource {
    wordlist: Vec<String>,
    max_concurrent: usize,
}

impl DnsWordlistSource {
    pub fn new(wordlist: Vec<String>, max_concurrent: usize) -> Self {
        Self {
            wordlist,
            max_concurrent: max_concurrent.max(1),
        }
    }

    async fn resolves(host: &str, deadline: Instant) -> bool {
        match tokio::time::timeout_at(deadline, tokio::net::lookup_host((host, 0))).await {
            Ok(Ok(mut addrs)) => addrs.next().is_some(),
            _ => false,
        }
    }
}

#[async_trait]
impl ToolAdapter for DnsWordlistSource {
    type Output = SubdomainCandidates;

    fn name(&self) -> &str {
        "dns"
    }

    #[instrument(skip_all, fields(adapter = "dns", domain = %domain))]
    async fn run(
        &self,
        domain: &str,
        _options: &ScanOptions,
        deadline: Instant,
    ) -> Result<SubdomainCandidates, AdapterError> {
        let names: SubdomainCandidates = futures::stream::iter(self.wordlist.iter().cloned())
            .map(|word| async move {
                let host = format!("{}.{}", word.trim().to_ascii_lowercase(), domain);
                Self::resolves(&host, deadline).await.then_some(host)
            })
            .buffer_unordered(self.max_concurrent)
            .filter_map(|host| async move { host })
            .collect()
            .await;

        debug!(
            tried = self.wordlist.len(),
            resolved = names.len(),
            "DNS wordlist candidates"
        );
        Ok(names)
    }
}
