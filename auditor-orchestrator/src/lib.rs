//! Auditor Orchestrator - Scan job lifecycle and dispatch
//!
//! This crate accepts scan submissions, records them as jobs, queues them on
//! a lane per scan type and runs them on a worker pool through the
//! [`ScanHandler`](auditor_core::domain::scan::ScanHandler) registered for
//! that type.
//!
//! # Features
//!
//! - **Job state machine** — `pending → running → {completed, failed}`, enforced by every store
//! - **Lanes** — bounded queue and concurrency ceiling per scan type
//! - **Worker pool** — per-job deadline, panic containment, graceful shutdown
//! - **Job stores** — in-memory, or PostgreSQL with compare-and-set transitions
//! - **HTTP API** — thin REST layer with an OpenAPI document
//!
//! # Architecture
//!
//! ```text
//! auditor-orchestrator/
//! ├── presentation/     # HTTP layer
//! │   ├── controllers.rs
//! │   ├── middleware.rs # Owner extractor, request logging
//! │   ├── models.rs     # DTOs with OpenAPI schemas
//! │   └── routes.rs
//! ├── application/
//! │   ├── dispatcher.rs # Submit, query, remove
//! │   └── workflow.rs   # State transitions
//! ├── infrastructure/
//! │   ├── handler_registry.rs
//! │   ├── job_queue.rs  # Lanes and worker pool
//! │   └── job_store/    # In-memory and PostgreSQL stores
//! └── domain/           # ScanJob, JobStatus
//! ```
//!
//! # API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/api/v1/scans` | POST | Submit a scan |
//! | `/api/v1/scans` | GET | List the caller's scans |
//! | `/api/v1/scans/{id}` | GET | Get a scan job |
//! | `/api/v1/scans/{id}` | DELETE | Remove a scan job |
//! | `/health` | GET | Health check |
//! | `/api-docs/openapi.json` | GET | OpenAPI document |

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
