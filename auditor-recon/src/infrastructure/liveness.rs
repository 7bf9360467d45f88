//! HTTP(S) liveness probe

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, instrument};

use auditor_core::domain::scan::ScanOptions;

use crate::domain::{AdapterError, ToolAdapter};
use crate::infrastructure::{build_http_client, remaining_until};

const SCHEMES: [&str; 2] = ["http", "https"];

/// A host is live when either scheme answers with a status in 100..=399
pub struct HttpLivenessProbe {
    client: reqwest::Client,
    per_scheme_timeout: Duration,
}

impl HttpLivenessProbe {
    pub fn new(per_scheme_timeout: Duration, user_agent: &str) -> Self {
        Self {
            client: build_http_client(user_agent, false),
            per_scheme_timeout,
        }
    }

    async fn answers(&self, url: &str, timeout: Duration) -> bool {
        match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => (100..=399).contains(&response.status().as_u16()),
            Err(e) => {
                debug!(url = %url, error = %e, "Liveness request failed");
                false
            }
        }
    }
}

#[async_trait]
impl ToolAdapter for HttpLivenessProbe {
    type Output = bool;

    fn name(&self) -> &str {
        "liveness"
    }

    #[instrument(skip_all, fields(adapter = "liveness", host = %host))]
    async fn run(
        &self,
        host: &str,
        _options: &ScanOptions,
        deadline: Instant,
    ) -> Result<bool, AdapterError> {
        for scheme in SCHEMES {
            let timeout = remaining_until(deadline, self.per_scheme_timeout);
            if timeout.is_zero() {
                break;
            }

            if self.answers(&format!("{}://{}/", scheme, host), timeout).await {
                return Ok(true);
            }
        }

        Ok(false)
    }
}
