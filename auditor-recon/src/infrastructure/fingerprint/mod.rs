//! HTTP technology fingerprinting

pub mod signatures;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, SERVER};
use tokio::time::Instant;
use tracing::{debug, instrument};

use auditor_core::domain::scan::ScanOptions;

use crate::domain::{AdapterError, TechFingerprint, ToolAdapter};
use crate::infrastructure::{
    MAX_PAGE_BYTES, build_http_client, classify_http_error, read_body_capped, remaining_until,
};

pub use signatures::{MarkerLocation, SIGNATURES, Signature, match_signatures};

/// Fetches a URL once and matches headers and body against the signature table
///
/// Only the first `max_body_bytes` of the page are inspected.
pub struct HttpFingerprinter {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpFingerprinter {
    pub fn new(user_agent: &str) -> Self {
        Self {
            client: build_http_client(user_agent, true),
            max_body_bytes: MAX_PAGE_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

fn lowercase_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        let entry = map.entry(name.as_str().to_ascii_lowercase()).or_default();
        if !entry.is_empty() {
            entry.push('\n');
        }
        entry.push_str(&value.to_ascii_lowercase());
    }
    map
}

#[async_trait]
impl ToolAdapter for HttpFingerprinter {
    type Output = TechFingerprint;

    fn name(&self) -> &str {
        "fingerprint"
    }

    #[instrument(skip_all, fields(adapter = "fingerprint", url = %url))]
    async fn run(
        &self,
        url: &str,
        _options: &ScanOptions,
        deadline: Instant,
    ) -> Result<TechFingerprint, AdapterError> {
        let response = self
            .client
            .get(url)
            .timeout(remaining_until(deadline, Duration::MAX))
            .send()
            .await
            .map_err(|e| classify_http_error(&e))?;

        let status = response.status();
        let server = response
            .headers()
            .get(SERVER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let headers = lowercase_headers(response.headers());

        let page = read_body_capped(response, self.max_body_bytes)
            .await
            .map_err(|e| classify_http_error(&e))?;
        let body = String::from_utf8_lossy(&page.bytes).to_lowercase();

        let matches = match_signatures(&headers, &body);
        debug!(
            status = %status,
            matched = matches.len(),
            truncated = page.truncated,
            "Fingerprint fetched"
        );

        Ok(TechFingerprint { matches, server })
    }
}
