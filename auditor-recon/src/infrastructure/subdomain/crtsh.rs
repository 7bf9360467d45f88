//! Certificate-transparency enumerator backed by crt.sh

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, instrument};

use auditor_core::domain::scan::ScanOptions;

use crate::domain::{AdapterError, SubdomainCandidates, ToolAdapter, normalize_hostname};
use crate::infrastructure::{
    MAX_CRTSH_BYTES, build_http_client, classify_http_error, read_body_capped, remaining_until,
};

#[derive(Debug, Deserialize)]
struct CertificateEntry {
    name_value: String,
}

/// Queries crt.sh for certificates issued to a domain and its subdomains
pub struct CrtShSource {
    client: reqwest::Client,
    base_url: String,
    max_body_bytes: usize,
}

impl CrtShSource {
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Self {
        Self {
            client: build_http_client(user_agent, true),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_body_bytes: MAX_CRTSH_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Names from a crt.sh response; wildcard entries are dropped.
fn names_from_entries(entries: Vec<CertificateEntry>) -> SubdomainCandidates {
    entries
        .iter()
        .flat_map(|entry| entry.name_value.lines())
        .map(str::trim)
        .filter(|name| !name.starts_with("*."))
        .filter_map(normalize_hostname)
        .collect()
}

#[async_trait]
impl ToolAdapter for CrtShSource {
    type Output = SubdomainCandidates;

    fn name(&self) -> &str {
        "crtsh"
    }

    #[instrument(skip_all, fields(adapter = "crtsh", domain = %domain))]
    async fn run(
        &self,
        domain: &str,
        _options: &ScanOptions,
        deadline: Instant,
    ) -> Result<SubdomainCandidates, AdapterError> {
        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[("q", format!("%.{}", domain).as_str()), ("output", "json")])
            .timeout(remaining_until(deadline, Duration::MAX))
            .send()
            .await
            .map_err(|e| classify_http_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::unknown(format!("crt.sh returned {}", status)));
        }

        let body = read_body_capped(response, self.max_body_bytes)
            .await
            .map_err(|e| classify_http_error(&e))?;
        if body.truncated {
            return Err(AdapterError::unknown(format!(
                "crt.sh response exceeds {} bytes",
                self.max_body_bytes
            )));
        }

        let entries: Vec<CertificateEntry> = serde_json::from_slice(&body.bytes)
            .map_err(|e| AdapterError::unknown(format!("unreadable crt.sh response: {}", e)))?;

        let names = names_from_entries(entries);
        debug!(count = names.len(), "crt.sh candidates");
        Ok(names)
    }
}
