//! Infrastructure layer: concrete tool adapters

pub mod fingerprint;
pub mod liveness;
pub mod ports;
pub mod subdomain;

pub use fingerprint::HttpFingerprinter;
pub use liveness::HttpLivenessProbe;
pub use ports::{NmapProber, TcpConnectProber};
pub use subdomain::{CommandSource, CrtShSource, DnsWordlistSource};

use std::io;
use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

use crate::domain::AdapterError;

/// Build the HTTP client shared by an adapter's requests.
pub(crate) fn build_http_client(user_agent: &str, follow_redirects: bool) -> reqwest::Client {
    let policy = if follow_redirects {
        reqwest::redirect::Policy::limited(5)
    } else {
        reqwest::redirect::Policy::none()
    };

    reqwest::Client::builder()
        .user_agent(user_agent)
        .redirect(policy)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build HTTP client, using defaults");
            reqwest::Client::new()
        })
}

/// Largest page body the fingerprinter reads from a target
pub const MAX_PAGE_BYTES: usize = 2 * 1024 * 1024;

/// Largest crt.sh response read; busy domains return large certificate lists
pub const MAX_CRTSH_BYTES: usize = 16 * 1024 * 1024;

/// A response body read up to a byte limit
pub(crate) struct CappedBody {
    pub bytes: Vec<u8>,
    /// The body continued past the limit and was not read further
    pub truncated: bool,
}

/// Read at most `limit` bytes of a response body, chunk by chunk.
pub(crate) async fn read_body_capped(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<CappedBody, reqwest::Error> {
    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit.saturating_sub(bytes.len());
        if chunk.len() > room {
            bytes.extend_from_slice(&chunk[..room]);
            return Ok(CappedBody {
                bytes,
                truncated: true,
            });
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(CappedBody {
        bytes,
        truncated: false,
    })
}

/// Time left until `deadline`, capped at `limit`.
pub(crate) fn remaining_until(deadline: Instant, limit: Duration) -> Duration {
    deadline.saturating_duration_since(Instant::now()).min(limit)
}

/// Map a request failure onto the adapter error taxonomy.
pub(crate) fn classify_http_error(error: &reqwest::Error) -> AdapterError {
    if error.is_timeout() {
        AdapterError::new(crate::domain::AdapterErrorKind::Timeout, error.to_string())
    } else if error.is_connect() {
        AdapterError::unreachable(error.to_string())
    } else if error.is_builder() {
        AdapterError::invalid_target(error.to_string())
    } else {
        AdapterError::unknown(error.to_string())
    }
}

/// Map a subprocess spawn failure onto the adapter error taxonomy.
pub(crate) fn classify_spawn_error(executable: &str, error: &io::Error) -> AdapterError {
    match error.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
            AdapterError::tool_unavailable(format!("{} is not available: {}", executable, error))
        }
        _ => AdapterError::unknown(format!("failed to run {}: {}", executable, error)),
    }
}
