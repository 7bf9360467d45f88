//! Web Auditor - asynchronous reconnaissance scan service
//!
//! Accepts scan submissions over HTTP, records them as jobs and runs them on
//! bounded per-scan-type worker lanes. See the `auditor-orchestrator` crate
//! for the job lifecycle and `auditor-recon` for the scan handlers.

mod app;

pub use app::{AppHandle, create_app, create_app_with_handlers};
pub use auditor_core::{Config, init_tracing};
