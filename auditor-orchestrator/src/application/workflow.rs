//! Job Workflow — single entry point for scan job state changes.
//!
//! Every status transition goes through [`JobWorkflow`], which hands it to
//! the [`JobStore`] (where it is validated against the state machine on
//! [`JobStatus`](crate::domain::JobStatus) and applied atomically) and logs
//! the outcome.
//!
//! ```text
//! Dispatcher          JobWorkflow          JobStore        Lane
//!     │                   │                   │              │
//!     ├─ create_job() ───►│── create ────────►│              │
//!     │◄── Job(Pending) ──┤                   │              │
//!     ├─ enqueue ─────────┼───────────────────┼─────────────►│
//!     │                   │                   │              │
//!     │  (worker picks)   │                   │              │
//!  Worker ─ start_job() ─►│── transition ────►│              │
//!     │◄── Job(Running) ──┤                   │              │
//!     ├─ complete_job() ─►│── transition ────►│              │
//!     │◄── Job(Completed)─┤                   │              │
//! ```

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use auditor_core::domain::scan::ScanResult;

use crate::domain::{JobTransitionError, NewScanJob, ScanJob, StatusChange};
use crate::infrastructure::job_store::{JobStore, JobStoreError};

/// Errors from the workflow layer.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid state transition: {0}")]
    InvalidTransition(JobTransitionError),

    #[error("Persistence error: {0}")]
    Store(JobStoreError),
}

impl WorkflowError {
    /// The job no longer exists, typically because it was deleted
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(JobStoreError::NotFound(_)))
    }
}

impl From<JobStoreError> for WorkflowError {
    fn from(error: JobStoreError) -> Self {
        match error {
            JobStoreError::InvalidTransition(e) => Self::InvalidTransition(e),
            other => Self::Store(other),
        }
    }
}

/// Centralised job lifecycle controller.
///
/// The dispatcher and the workers call `JobWorkflow` instead of writing to the
/// store directly.
#[derive(Clone)]
pub struct JobWorkflow {
    job_store: Arc<dyn JobStore>,
}

impl JobWorkflow {
    pub fn new(job_store: Arc<dyn JobStore>) -> Self {
        Self { job_store }
    }

    /// Persist a new job in `Pending`.
    pub async fn create_job(&self, new_job: NewScanJob) -> Result<ScanJob, WorkflowError> {
        let job = self.job_store.create(new_job).await?;
        info!(job_id = %job.id, scan_type = %job.scan_type, owner = %job.owner, "Job created");
        Ok(job)
    }

    /// Transition a job to `Running`.
    pub async fn start_job(&self, job_id: Uuid) -> Result<ScanJob, WorkflowError> {
        let job = self.job_store.transition(job_id, StatusChange::Start).await?;
        info!(job_id = %job_id, "Job transitioned to Running");
        Ok(job)
    }

    /// Transition a job to `Completed` with its result.
    pub async fn complete_job(
        &self,
        job_id: Uuid,
        result: ScanResult,
    ) -> Result<ScanJob, WorkflowError> {
        let job = self
            .job_store
            .transition(job_id, StatusChange::Complete(result))
            .await?;
        info!(job_id = %job_id, "Job transitioned to Completed");
        Ok(job)
    }

    /// Transition a job to `Failed` with a caller-facing reason.
    pub async fn fail_job(&self, job_id: Uuid, reason: String) -> Result<ScanJob, WorkflowError> {
        let job = self
            .job_store
            .transition(job_id, StatusChange::Fail(reason.clone()))
            .await?;
        warn!(job_id = %job_id, reason = %reason, "Job transitioned to Failed");
        Ok(job)
    }

    pub fn job_store(&self) -> &Arc<dyn JobStore> {
        &self.job_store
    }
}
