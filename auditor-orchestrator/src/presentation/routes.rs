//! Route definitions

use std::time::Duration;

use axum::http::StatusCode;
use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::OpenApi;

use auditor_core::config::ServerConfig;

use crate::domain::{JobStatus, JobTransition};
use crate::presentation::{
    controllers::{
        ScanApiState, create_scan, delete_scan, get_scan, health_check, list_scans,
        recon_port_scan, recon_subdomains, recon_tech_stack,
    },
    middleware::logging_middleware,
    models::*,
};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::presentation::controllers::create_scan,
        crate::presentation::controllers::list_scans,
        crate::presentation::controllers::get_scan,
        crate::presentation::controllers::delete_scan,
        crate::presentation::controllers::recon_subdomains,
        crate::presentation::controllers::recon_port_scan,
        crate::presentation::controllers::recon_tech_stack,
        crate::presentation::controllers::health_check,
    ),
    components(
        schemas(
            CreateScanRequest,
            ScanJobResponse,
            ScanListResponse,
            ErrorResponse,
            HealthResponse,
            SubdomainReconRequest,
            SubdomainReconResponse,
            PortScanReconRequest,
            PortScanReconResponse,
            TechStackReconResponse,
            JobStatus,
            JobTransition
        )
    ),
    tags(
        (name = "scans", description = "Asynchronous scan submission and job tracking"),
        (name = "recon", description = "Direct recon calls answered inline, without a job record"),
        (name = "health", description = "Service health")
    ),
    info(
        title = "Web Auditor API",
        version = "0.1.0",
        description = "Submit subdomain enumeration, port scan and technology fingerprinting jobs against external targets and track them to completion."
    )
)]
pub struct ApiDoc;

/// Create the application router with its middleware stack
pub fn create_router(state: ScanApiState, config: &ServerConfig) -> Router {
    let api_routes = Router::new()
        .route("/scans", get(list_scans).post(create_scan))
        .route("/scans/{id}", get(get_scan).delete(delete_scan))
        .route("/recon/subdomain", post(recon_subdomains))
        .route("/recon/port-scan", post(recon_port_scan))
        // Wildcard so unencoded URLs with slashes still match
        .route("/recon/tech-stack/{*url}", get(recon_tech_stack));

    let mut router = Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check));

    if config.enable_docs {
        router = router.route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    let cors_layer = if config.allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<axum::http::HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| {
                axum::http::HeaderValue::from_str(origin)
                    .map_err(|_| {
                        tracing::warn!(origin, "Invalid CORS origin in config; skipping");
                    })
                    .ok()
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::ACCEPT,
                axum::http::HeaderName::from_static(crate::presentation::middleware::OWNER_HEADER),
            ])
            .max_age(Duration::from_secs(3600))
    };

    let service_builder = ServiceBuilder::new()
        // HTTP tracing
        .layer(TraceLayer::new_for_http())
        // CORS handling
        .layer(cors_layer)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_seconds),
        ))
        .layer(middleware::from_fn(logging_middleware));

    router.layer(service_builder).with_state(state)
}
