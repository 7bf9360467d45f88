//! Orchestrator application layer

pub mod dispatcher;
pub mod recon;
pub mod workflow;

pub use dispatcher::{ScanDispatcher, ScanRequest, SubmitError};
pub use recon::{ReconError, ReconRunner};
pub use workflow::{JobWorkflow, WorkflowError};
