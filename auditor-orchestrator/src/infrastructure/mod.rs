//! Orchestrator infrastructure layer

pub mod handler_registry;
pub mod job_queue;
pub mod job_store;

pub use handler_registry::*;
pub use job_queue::*;
pub use job_store::*;
