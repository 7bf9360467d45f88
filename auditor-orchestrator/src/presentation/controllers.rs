//! HTTP controllers for the scan API

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use uuid::Uuid;

use auditor_core::domain::scan::{ScanExecutionError, ScanOptions, ScanResult, ScanType};

use crate::application::{ReconError, ReconRunner, ScanDispatcher, ScanRequest, SubmitError};
use crate::infrastructure::job_store::JobStoreError;
use crate::presentation::middleware::{Owner, error_response};
use crate::presentation::models::{
    CreateScanRequest, ErrorResponse, HealthResponse, ListScansQuery, PortScanReconRequest,
    PortScanReconResponse, ScanJobResponse, ScanListResponse, SubdomainReconRequest,
    SubdomainReconResponse, TechStackReconResponse,
};

/// Shared state of the HTTP layer
#[derive(Clone)]
pub struct ScanApiState {
    pub dispatcher: Arc<ScanDispatcher>,
    pub recon: Arc<ReconRunner>,
}

fn validation_error_response(message: impl Into<String>) -> Response {
    error_response(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message, None)
}

fn not_found_response(id: Uuid) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        format!("Scan job {} not found", id),
        None,
    )
}

fn store_error_response(error: JobStoreError) -> Response {
    match error {
        JobStoreError::NotFound(id) => not_found_response(id),
        other => {
            tracing::error!(error = %other, "Job store error mapped to HTTP response");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error",
                None,
            )
        }
    }
}

fn recon_error_response(error: ReconError) -> Response {
    match error {
        ReconError::Validation(e) => validation_error_response(e.to_string()),
        ReconError::Unsupported(e) => {
            error_response(StatusCode::BAD_REQUEST, "UNSUPPORTED_SCAN_TYPE", e.to_string(), None)
        }
        ReconError::Execution(ScanExecutionError::Timeout) => error_response(
            StatusCode::GATEWAY_TIMEOUT,
            "SCAN_TIMEOUT",
            ScanExecutionError::Timeout.public_message(),
            None,
        ),
        ReconError::Execution(e @ ScanExecutionError::InvalidTarget(_)) => {
            error_response(StatusCode::BAD_REQUEST, "INVALID_TARGET", e.public_message(), None)
        }
        ReconError::Execution(e @ ScanExecutionError::AllAdaptersFailed(_)) => {
            error_response(StatusCode::BAD_GATEWAY, "SCAN_FAILED", e.public_message(), None)
        }
        ReconError::Execution(e) => {
            tracing::error!(error = %e, "Direct recon call failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "SCAN_FAILED",
                e.public_message(),
                None,
            )
        }
    }
}

fn unexpected_result_response(expected: ScanType, result: &ScanResult) -> Response {
    tracing::error!(expected = %expected, actual = %result.scan_type(), "Handler returned a foreign result");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "SCAN_FAILED",
        "scan execution failed",
        None,
    )
}

/// POST /api/v1/scans - Submit a scan
#[utoipa::path(
    post,
    path = "/api/v1/scans",
    request_body = CreateScanRequest,
    params(
        ("X-Owner-Id" = String, Header, description = "Identity of the caller")
    ),
    responses(
        (status = 202, description = "Scan accepted and queued", body = ScanJobResponse),
        (status = 400, description = "Invalid request or unsupported scan type", body = ErrorResponse),
        (status = 401, description = "Missing owner header", body = ErrorResponse),
        (status = 503, description = "Scan queue is full", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "scans"
)]
pub async fn create_scan(
    State(state): State<ScanApiState>,
    Owner(owner): Owner,
    Json(request): Json<CreateScanRequest>,
) -> Response {
    let scan_type: ScanType = match request.scan_type.parse() {
        Ok(scan_type) => scan_type,
        Err(e) => return validation_error_response(e.to_string()),
    };

    let options: ScanOptions = match request.options {
        Some(value) => match serde_json::from_value(value) {
            Ok(options) => options,
            Err(e) => return validation_error_response(format!("Invalid scan options: {}", e)),
        },
        None => ScanOptions::default(),
    };

    let submitted = state
        .dispatcher
        .submit(ScanRequest {
            target: request.target,
            scan_type,
            options,
            owner,
        })
        .await;

    match submitted {
        Ok(job) => (StatusCode::ACCEPTED, Json(ScanJobResponse::from(job))).into_response(),
        Err(SubmitError::Validation(e)) => validation_error_response(e.to_string()),
        Err(SubmitError::Unsupported(job)) => {
            let message = job.error.clone().unwrap_or_default();
            error_response(
                StatusCode::BAD_REQUEST,
                "UNSUPPORTED_SCAN_TYPE",
                message,
                Some(serde_json::json!({ "job_id": job.id })),
            )
        }
        Err(SubmitError::QueueUnavailable { job, source }) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "QUEUE_UNAVAILABLE",
            source.to_string(),
            Some(serde_json::json!({ "job_id": job.id })),
        ),
        Err(SubmitError::Workflow(e)) => {
            tracing::error!(error = %e, "Failed to submit scan");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error",
                None,
            )
        }
    }
}

/// GET /api/v1/scans - List the caller's scans
#[utoipa::path(
    get,
    path = "/api/v1/scans",
    params(
        ("X-Owner-Id" = String, Header, description = "Identity of the caller"),
        ListScansQuery
    ),
    responses(
        (status = 200, description = "Jobs, newest first", body = ScanListResponse),
        (status = 401, description = "Missing owner header", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "scans"
)]
pub async fn list_scans(
    State(state): State<ScanApiState>,
    Owner(owner): Owner,
    Query(query): Query<ListScansQuery>,
) -> Response {
    let (offset, limit) = (query.offset(), query.limit());
    match state.dispatcher.list(&owner, offset, limit).await {
        Ok(jobs) => Json(ScanListResponse {
            jobs: jobs.into_iter().map(ScanJobResponse::from).collect(),
            offset,
            limit,
        })
        .into_response(),
        Err(e) => store_error_response(e),
    }
}

/// GET /api/v1/scans/{id} - Retrieve a scan job
#[utoipa::path(
    get,
    path = "/api/v1/scans/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID"),
        ("X-Owner-Id" = String, Header, description = "Identity of the caller")
    ),
    responses(
        (status = 200, description = "Job found", body = ScanJobResponse),
        (status = 401, description = "Missing owner header", body = ErrorResponse),
        (status = 404, description = "Job not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "scans"
)]
pub async fn get_scan(
    State(state): State<ScanApiState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
) -> Response {
    match state.dispatcher.get(id).await {
        // Another owner's job is indistinguishable from a missing one
        Ok(job) if job.is_owned_by(&owner) => Json(ScanJobResponse::from(job)).into_response(),
        Ok(_) => not_found_response(id),
        Err(e) => store_error_response(e),
    }
}

/// DELETE /api/v1/scans/{id} - Remove a scan job
#[utoipa::path(
    delete,
    path = "/api/v1/scans/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID"),
        ("X-Owner-Id" = String, Header, description = "Identity of the caller")
    ),
    responses(
        (status = 204, description = "Job removed"),
        (status = 401, description = "Missing owner header", body = ErrorResponse),
        (status = 404, description = "Job not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "scans"
)]
pub async fn delete_scan(
    State(state): State<ScanApiState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
) -> Response {
    match state.dispatcher.remove(id, &owner).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => store_error_response(e),
    }
}

/// POST /api/v1/recon/subdomain - Enumerate subdomains and wait for the result
#[utoipa::path(
    post,
    path = "/api/v1/recon/subdomain",
    request_body = SubdomainReconRequest,
    params(
        ("X-Owner-Id" = String, Header, description = "Identity of the caller")
    ),
    responses(
        (status = 200, description = "Enumeration finished", body = SubdomainReconResponse),
        (status = 400, description = "Invalid domain or enumerator", body = ErrorResponse),
        (status = 401, description = "Missing owner header", body = ErrorResponse),
        (status = 502, description = "Every enumerator failed", body = ErrorResponse),
        (status = 504, description = "Lane deadline reached", body = ErrorResponse)
    ),
    tag = "recon"
)]
pub async fn recon_subdomains(
    State(state): State<ScanApiState>,
    Owner(owner): Owner,
    Json(request): Json<SubdomainReconRequest>,
) -> Response {
    tracing::debug!(owner = %owner, domain = %request.domain, "Direct subdomain enumeration");
    let domain = request.domain.trim().to_string();
    match state
        .recon
        .run(ScanType::Subdomain, &domain, request.options())
        .await
    {
        Ok(ScanResult::Subdomain(result)) => {
            Json(SubdomainReconResponse::new(domain, request.tools, result)).into_response()
        }
        Ok(other) => unexpected_result_response(ScanType::Subdomain, &other),
        Err(e) => recon_error_response(e),
    }
}

/// POST /api/v1/recon/port-scan - Scan ports and wait for the result
#[utoipa::path(
    post,
    path = "/api/v1/recon/port-scan",
    request_body = PortScanReconRequest,
    params(
        ("X-Owner-Id" = String, Header, description = "Identity of the caller")
    ),
    responses(
        (status = 200, description = "Scan finished", body = PortScanReconResponse),
        (status = 400, description = "Invalid target or port spec", body = ErrorResponse),
        (status = 401, description = "Missing owner header", body = ErrorResponse),
        (status = 504, description = "Lane deadline reached", body = ErrorResponse)
    ),
    tag = "recon"
)]
pub async fn recon_port_scan(
    State(state): State<ScanApiState>,
    Owner(owner): Owner,
    Json(request): Json<PortScanReconRequest>,
) -> Response {
    tracing::debug!(owner = %owner, target = %request.target, "Direct port scan");
    let target = request.target.trim().to_string();
    match state
        .recon
        .run(ScanType::PortScan, &target, request.options())
        .await
    {
        Ok(ScanResult::PortScan(result)) => {
            Json(PortScanReconResponse::new(target, request.scan_type, result)).into_response()
        }
        Ok(other) => unexpected_result_response(ScanType::PortScan, &other),
        Err(e) => recon_error_response(e),
    }
}

/// GET /api/v1/recon/tech-stack/{url} - Fingerprint a page and wait for the result
#[utoipa::path(
    get,
    path = "/api/v1/recon/tech-stack/{url}",
    params(
        ("url" = String, Path, description = "Page URL, percent-encoded or raw"),
        ("X-Owner-Id" = String, Header, description = "Identity of the caller")
    ),
    responses(
        (status = 200, description = "Fingerprinting finished", body = TechStackReconResponse),
        (status = 400, description = "Invalid URL", body = ErrorResponse),
        (status = 401, description = "Missing owner header", body = ErrorResponse),
        (status = 504, description = "Lane deadline reached", body = ErrorResponse)
    ),
    tag = "recon"
)]
pub async fn recon_tech_stack(
    State(state): State<ScanApiState>,
    Owner(owner): Owner,
    Path(url): Path<String>,
) -> Response {
    tracing::debug!(owner = %owner, url = %url, "Direct tech stack fingerprint");
    let url = url.trim().to_string();
    match state
        .recon
        .run(ScanType::TechStack, &url, ScanOptions::default())
        .await
    {
        Ok(ScanResult::TechStack(result)) => {
            Json(TechStackReconResponse::new(url, result)).into_response()
        }
        Ok(other) => unexpected_result_response(ScanType::TechStack, &other),
        Err(e) => recon_error_response(e),
    }
}

/// GET /health - Service health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<ScanApiState>) -> Json<HealthResponse> {
    let scan_types: Vec<String> = state
        .dispatcher
        .registry()
        .registered_types()
        .iter()
        .map(|t| t.to_string())
        .collect();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        details: Some(serde_json::json!({ "scan_types": scan_types })),
    })
}
