//! Scan value objects

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

/// Scan type identifier
///
/// Used for handler registration, lane routing and persistence. Only some
/// scan types have a handler registered at any given time; the rest are
/// rejected at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    /// Subdomain enumeration with liveness probing
    Subdomain,
    /// TCP port scan
    PortScan,
    /// Technology stack fingerprinting
    TechStack,
    Vulnerability,
    SqlInjection,
    Xss,
    DirectoryBruteforce,
    CmsScan,
}

impl ScanType {
    pub const ALL: [ScanType; 8] = [
        Self::Subdomain,
        Self::PortScan,
        Self::TechStack,
        Self::Vulnerability,
        Self::SqlInjection,
        Self::Xss,
        Self::DirectoryBruteforce,
        Self::CmsScan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subdomain => "subdomain",
            Self::PortScan => "port_scan",
            Self::TechStack => "tech_stack",
            Self::Vulnerability => "vulnerability",
            Self::SqlInjection => "sql_injection",
            Self::Xss => "xss",
            Self::DirectoryBruteforce => "directory_bruteforce",
            Self::CmsScan => "cms_scan",
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name any scan type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown scan type: {0}")]
pub struct ScanTypeParseError(pub String);

impl FromStr for ScanType {
    type Err = ScanTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| ScanTypeParseError(s.to_string()))
    }
}

/// How the port list of a port scan is chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortScanMode {
    /// Fixed set of twelve well-known ports
    #[default]
    Fast,
    /// Every port from 1 to 65535
    Full,
    /// Caller-supplied port spec in [`ScanOptions::ports`]
    Custom,
}

/// Caller-supplied scan options
///
/// Every field is optional so a plain `{}` is accepted; handlers ignore the
/// fields that do not apply to them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    pub port_mode: PortScanMode,
    /// Comma-separated ports and inclusive ranges, e.g. `22,80,8000-8100`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<String>,
    /// Subdomain enumerators to use instead of the configured defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

/// Upper bound on the time kept back from adapters for aggregation
pub const AGGREGATION_RESERVE: Duration = Duration::from_secs(1);

/// Execution context handed to a scan handler
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub job_id: Uuid,
    pub target: String,
    pub options: ScanOptions,
    /// Hard deadline for the whole job
    pub deadline: Instant,
}

impl ScanContext {
    pub fn new(job_id: Uuid, target: impl Into<String>, options: ScanOptions, timeout: Duration) -> Self {
        Self {
            job_id,
            target: target.into(),
            options,
            deadline: Instant::now() + timeout,
        }
    }

    /// Cutoff for adapter work.
    ///
    /// Keeps a tenth of the remaining time (at most [`AGGREGATION_RESERVE`])
    /// for merging results, so adapters finishing at the cutoff never run the
    /// job past its deadline.
    pub fn work_deadline(&self) -> Instant {
        let now = Instant::now();
        let remaining = self.deadline.saturating_duration_since(now);
        now + (remaining - (remaining / 10).min(AGGREGATION_RESERVE))
    }

    /// Deadline for one adapter: its own timeout, capped by the work cutoff.
    pub fn adapter_deadline(&self, timeout: Duration) -> Instant {
        (Instant::now() + timeout).min(self.work_deadline())
    }

    /// Deadline for a stage that may use `share` (0..=1) of the time left
    /// before the work cutoff, leaving the rest to later stages.
    pub fn stage_deadline(&self, share: f64) -> Instant {
        let now = Instant::now();
        let available = self.work_deadline().saturating_duration_since(now);
        now + available.mul_f64(share.clamp(0.0, 1.0))
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// Submission-time validation failure. Jobs failing validation are never created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanValidationError {
    #[error("Target cannot be empty")]
    EmptyTarget,

    #[error("Invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("Invalid port specification: {0}")]
    InvalidPortSpec(String),

    #[error("Custom port scans require a port specification")]
    MissingPorts,

    #[error("Unknown subdomain source: {0}")]
    UnknownSource(String),
}

impl ScanValidationError {
    pub fn invalid_target(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Scan execution error
#[derive(Debug, thiserror::Error)]
pub enum ScanExecutionError {
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("All adapters failed: {0}")]
    AllAdaptersFailed(String),

    #[error("timeout")]
    Timeout,

    #[error("Scan execution failed: {0}")]
    ExecutionFailed(String),
}

impl ScanExecutionError {
    /// Message safe to store on the job and show to callers.
    ///
    /// Internal failure detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::ExecutionFailed(_) => "scan execution failed".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_type_round_trips_through_str() {
        for scan_type in ScanType::ALL {
            assert_eq!(scan_type.as_str().parse::<ScanType>(), Ok(scan_type));
        }
        assert_eq!(" Port_Scan ".parse::<ScanType>(), Ok(ScanType::PortScan));
    }

    #[test]
    fn test_unknown_scan_type_is_rejected() {
        let err = "bogus".parse::<ScanType>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown scan type: bogus");
    }

    #[test]
    fn test_scan_type_serializes_snake_case() {
        let json = serde_json::to_string(&ScanType::TechStack).unwrap();
        assert_eq!(json, "\"tech_stack\"");
    }

    #[test]
    fn test_options_default_from_empty_object() {
        let options: ScanOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.port_mode, PortScanMode::Fast);
        assert!(options.ports.is_none());
        assert!(options.sources.is_none());
    }

    #[test]
    fn test_execution_failed_message_is_redacted() {
        let err = ScanExecutionError::ExecutionFailed("stack: at src/foo.rs:12".to_string());
        assert_eq!(err.public_message(), "scan execution failed");
        assert_eq!(ScanExecutionError::Timeout.public_message(), "timeout");
    }

    #[tokio::test]
    async fn test_adapter_deadline_is_capped_by_job_deadline() {
        let context = ScanContext::new(
            Uuid::new_v4(),
            "example.com",
            ScanOptions::default(),
            Duration::from_secs(1),
        );
        let deadline = context.adapter_deadline(Duration::from_secs(30));
        assert!(deadline < context.deadline);
        assert!(deadline <= context.work_deadline());
        assert!(context.remaining() <= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_work_deadline_keeps_aggregation_reserve() {
        let context = ScanContext::new(
            Uuid::new_v4(),
            "10.0.0.1",
            ScanOptions::default(),
            Duration::from_secs(90),
        );
        assert_eq!(context.deadline - context.work_deadline(), AGGREGATION_RESERVE);

        let short = ScanContext::new(
            Uuid::new_v4(),
            "10.0.0.1",
            ScanOptions::default(),
            Duration::from_millis(500),
        );
        assert_eq!(short.deadline - short.work_deadline(), Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_deadline_leaves_time_for_later_stages() {
        let context = ScanContext::new(
            Uuid::new_v4(),
            "10.0.0.1",
            ScanOptions::default(),
            Duration::from_secs(91),
        );
        let start = Instant::now();
        assert_eq!(context.stage_deadline(0.5) - start, Duration::from_secs(45));
        assert_eq!(context.stage_deadline(1.0), context.work_deadline());
    }
}
