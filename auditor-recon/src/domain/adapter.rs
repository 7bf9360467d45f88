//! Tool adapter contract

use std::fmt;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use auditor_core::domain::scan::ScanOptions;

/// Classification of an adapter failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterErrorKind {
    Timeout,
    Unreachable,
    InvalidTarget,
    ToolUnavailable,
    Unknown,
}

impl AdapterErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Unreachable => "unreachable",
            Self::InvalidTarget => "invalid_target",
            Self::ToolUnavailable => "tool_unavailable",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AdapterErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed failure of a single adapter run
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct AdapterError {
    pub kind: AdapterErrorKind,
    pub message: String,
}

impl AdapterError {
    pub fn new(kind: AdapterErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(adapter: &str) -> Self {
        Self::new(
            AdapterErrorKind::Timeout,
            format!("{} exceeded its deadline", adapter),
        )
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::Unreachable, message)
    }

    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::InvalidTarget, message)
    }

    pub fn tool_unavailable(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::ToolUnavailable, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::Unknown, message)
    }

    /// Whether the failure degrades to an empty contribution.
    ///
    /// Only an invalid target invalidates the job.
    pub fn is_degradable(&self) -> bool {
        self.kind != AdapterErrorKind::InvalidTarget
    }
}

/// A single reconnaissance technique
///
/// Expected negative outcomes (no records, closed port, host down) are an
/// empty `Output`, not an error.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    type Output: Send;

    /// Stable adapter name, used for source selection and logging
    fn name(&self) -> &str;

    /// Run the technique against `target`.
    ///
    /// Implementations should stop their own network work by `deadline`;
    /// callers go through [`run_adapter`], which stops waiting regardless.
    async fn run(
        &self,
        target: &str,
        options: &ScanOptions,
        deadline: Instant,
    ) -> Result<Self::Output, AdapterError>;
}

/// Run an adapter and stop waiting for it at `deadline`.
pub async fn run_adapter<A>(
    adapter: &A,
    target: &str,
    options: &ScanOptions,
    deadline: Instant,
) -> Result<A::Output, AdapterError>
where
    A: ToolAdapter + ?Sized,
{
    let outcome = match tokio::time::timeout_at(deadline, adapter.run(target, options, deadline)).await
    {
        Ok(outcome) => outcome,
        Err(_) => Err(AdapterError::timeout(adapter.name())),
    };

    if let Err(e) = &outcome {
        debug!(
            adapter = adapter.name(),
            kind = %e.kind,
            error = %e.message,
            "Adapter run failed"
        );
    }

    outcome
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    struct SlowAdapter;

    #[async_trait]
    impl ToolAdapter for SlowAdapter {
        type Output = u32;

        fn name(&self) -> &str {
            "slow"
        }

        async fn run(
            &self,
            _target: &str,
            _options: &ScanOptions,
            _deadline: Instant,
        ) -> Result<u32, AdapterError> {
            // Ignores its deadline on purpose
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(1)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_adapter_stops_waiting_at_deadline() {
        let deadline = Instant::now() + Duration::from_millis(50);
        let err = run_adapter(&SlowAdapter, "example.com", &ScanOptions::default(), deadline)
            .await
            .unwrap_err();

        assert_eq!(err.kind, AdapterErrorKind::Timeout);
        assert!(err.is_degradable());
    }

    #[test]
    fn test_only_invalid_target_is_fatal() {
        assert!(!AdapterError::invalid_target("bad").is_degradable());
        assert!(AdapterError::unreachable("down").is_degradable());
        assert!(AdapterError::tool_unavailable("nmap").is_degradable());
        assert!(AdapterError::unknown("boom").is_degradable());
    }
}
