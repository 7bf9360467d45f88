//! Orchestrator presentation layer

pub mod controllers;
pub mod middleware;
pub mod models;
pub mod routes;

pub use controllers::ScanApiState;
pub use middleware::{OWNER_HEADER, Owner, error_response, logging_middleware};
pub use models::*;
pub use routes::{ApiDoc, create_router};
