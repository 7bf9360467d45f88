//! API request/response models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use std::collections::BTreeMap;

use auditor_core::domain::scan::{
    PortProbeStrategy, PortScanMode, PortScanResult, ScanOptions, ScanResult, SubdomainResult,
    TechStackResult,
};

use crate::domain::{JobStatus, JobTransition, ScanJob};

/// Default page size for job listings
pub const DEFAULT_PAGE_LIMIT: usize = 100;
/// Largest page a caller may request
pub const MAX_PAGE_LIMIT: usize = 500;

/// Request to submit a new scan
#[derive(Deserialize, ToSchema)]
pub struct CreateScanRequest {
    /// Domain, host, IP address or URL to scan
    #[schema(example = "example.com")]
    pub target: String,

    /// One of `subdomain`, `port_scan`, `tech_stack`, `vulnerability`,
    /// `sql_injection`, `xss`, `directory_bruteforce`, `cms_scan`
    #[schema(example = "port_scan")]
    pub scan_type: String,

    /// Scan-type specific options
    #[serde(default)]
    #[schema(value_type = Option<Object>, example = json!({"port_mode": "custom", "ports": "22,80,8000-8100"}))]
    pub options: Option<serde_json::Value>,
}

/// A scan job as seen by its owner
#[derive(Serialize, ToSchema)]
pub struct ScanJobResponse {
    pub id: Uuid,
    #[schema(example = "example.com")]
    pub target: String,
    #[schema(example = "subdomain")]
    pub scan_type: String,
    pub status: JobStatus,
    #[schema(value_type = Object)]
    pub options: ScanOptions,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Present only once the job has completed; tagged by `kind`
    #[schema(value_type = Option<Object>)]
    pub result: Option<ScanResult>,
    /// Present only once the job has failed
    pub error: Option<String>,
    pub transitions: Vec<JobTransition>,
}

impl From<ScanJob> for ScanJobResponse {
    fn from(job: ScanJob) -> Self {
        Self {
            id: job.id,
            target: job.target,
            scan_type: job.scan_type.to_string(),
            status: job.status,
            options: job.options,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            result: job.result,
            error: job.error,
            transitions: job.transitions,
        }
    }
}

/// Paging parameters for job listings
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListScansQuery {
    /// Number of jobs to skip
    pub offset: Option<usize>,
    /// Page size, capped at 500
    pub limit: Option<usize>,
}

impl ListScansQuery {
    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT)
    }
}

/// One page of the caller's jobs, newest first
#[derive(Serialize, ToSchema)]
pub struct ScanListResponse {
    pub jobs: Vec<ScanJobResponse>,
    pub offset: usize,
    pub limit: usize,
}

/// Direct subdomain enumeration
#[derive(Deserialize, ToSchema)]
pub struct SubdomainReconRequest {
    #[schema(example = "example.com")]
    pub domain: String,

    /// Enumerators to use; the configured defaults when omitted
    #[serde(default)]
    #[schema(example = json!(["subfinder", "amass"]))]
    pub tools: Option<Vec<String>>,
}

impl SubdomainReconRequest {
    pub fn options(&self) -> ScanOptions {
        ScanOptions {
            sources: self.tools.clone(),
            ..ScanOptions::default()
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SubdomainReconResponse {
    pub domain: String,
    /// Requested enumerators, absent when the defaults ran
    pub tools_used: Option<Vec<String>>,
    pub subdomains: Vec<String>,
    pub total_found: usize,
    pub live_subdomains: Vec<String>,
}

impl SubdomainReconResponse {
    pub fn new(domain: String, tools_used: Option<Vec<String>>, result: SubdomainResult) -> Self {
        Self {
            domain,
            tools_used,
            total_found: result.subdomains.len(),
            subdomains: result.subdomains.into_iter().collect(),
            live_subdomains: result.live_subdomains.into_iter().collect(),
        }
    }
}

/// Direct port scan
#[derive(Deserialize, ToSchema)]
pub struct PortScanReconRequest {
    #[schema(example = "scanme.example.com")]
    pub target: String,

    /// `fast`, `full` or `custom`
    #[serde(default)]
    #[schema(value_type = String, example = "fast")]
    pub scan_type: PortScanMode,

    /// Port spec for `custom` scans, e.g. `22,80,8000-8100`
    #[serde(default)]
    pub ports: Option<String>,
}

impl PortScanReconRequest {
    pub fn options(&self) -> ScanOptions {
        ScanOptions {
            port_mode: self.scan_type,
            ports: self.ports.clone(),
            ..ScanOptions::default()
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PortScanReconResponse {
    pub target: String,
    #[schema(value_type = String, example = "fast")]
    pub scan_type: PortScanMode,
    pub open_ports: Vec<u16>,
    #[schema(value_type = Object, example = json!({"22": "ssh", "443": "https"}))]
    pub services: BTreeMap<u16, String>,
    pub total_ports_scanned: usize,
    #[schema(value_type = String, example = "connect")]
    pub strategy: PortProbeStrategy,
}

impl PortScanReconResponse {
    pub fn new(target: String, scan_type: PortScanMode, result: PortScanResult) -> Self {
        Self {
            target,
            scan_type,
            open_ports: result.open_ports.into_iter().collect(),
            services: result.services,
            total_ports_scanned: result.total_scanned,
            strategy: result.strategy,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TechStackReconResponse {
    #[schema(example = "https://example.com")]
    pub url: String,
    pub technologies: Vec<String>,
    pub cms: Option<String>,
    pub web_server: Option<String>,
    pub programming_languages: Vec<String>,
    pub frameworks: Vec<String>,
}

impl TechStackReconResponse {
    pub fn new(url: String, result: TechStackResult) -> Self {
        Self {
            url,
            technologies: result.technologies.into_iter().collect(),
            cms: result.cms,
            web_server: result.web_server,
            programming_languages: result.programming_languages.into_iter().collect(),
            frameworks: result.frameworks.into_iter().collect(),
        }
    }
}

/// Error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code
    #[schema(example = "VALIDATION_ERROR")]
    pub code: String,

    /// Human-readable error message
    #[schema(example = "Invalid port specification: 70000 is outside 1-65535")]
    pub message: String,

    /// Additional error context
    pub details: Option<serde_json::Value>,

    /// Unique request identifier for tracking and support
    pub request_id: Uuid,

    /// Error occurrence timestamp
    #[schema(example = "2024-01-15T10:30:00Z")]
    pub timestamp: DateTime<Utc>,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall service health status
    #[schema(example = "healthy")]
    pub status: String,

    /// Current service version
    #[schema(example = "0.1.0")]
    pub version: String,

    /// Health check timestamp
    pub timestamp: DateTime<Utc>,

    /// Scan types with a registered handler
    #[schema(example = json!({"scan_types": ["subdomain", "port_scan", "tech_stack"]}))]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_limit_defaults_and_cap() {
        let query = ListScansQuery {
            offset: None,
            limit: None,
        };
        assert_eq!(query.offset(), 0);
        assert_eq!(query.limit(), DEFAULT_PAGE_LIMIT);

        let query = ListScansQuery {
            offset: Some(5),
            limit: Some(10_000),
        };
        assert_eq!(query.offset(), 5);
        assert_eq!(query.limit(), MAX_PAGE_LIMIT);
    }

    #[test]
    fn test_request_options_are_optional() {
        let request: CreateScanRequest =
            serde_json::from_str(r#"{"target": "example.com", "scan_type": "subdomain"}"#).unwrap();
        assert!(request.options.is_none());
    }
}
