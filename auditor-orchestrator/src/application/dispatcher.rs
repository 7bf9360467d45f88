//! Scan dispatcher: submission, query and removal of scan jobs

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use auditor_core::domain::scan::{ScanOptions, ScanType, ScanValidationError};

use super::workflow::{JobWorkflow, WorkflowError};
use crate::domain::{NewScanJob, OwnerId, ScanJob};
use crate::infrastructure::handler_registry::HandlerRegistry;
use crate::infrastructure::job_queue::{JobQueueError, JobQueueHandle, QueuedJob};
use crate::infrastructure::job_store::JobStoreError;

/// A scan submission
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub target: String,
    pub scan_type: ScanType,
    pub options: ScanOptions,
    pub owner: OwnerId,
}

/// Why a submission did not produce a pending job
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Rejected before any record was created
    #[error(transparent)]
    Validation(#[from] ScanValidationError),

    /// Recorded, then failed immediately without being queued
    #[error("{}", .0.error.as_deref().unwrap_or("Unsupported scan type"))]
    Unsupported(Box<ScanJob>),

    /// Recorded, then failed because its lane could not take it
    #[error("{source}")]
    QueueUnavailable {
        job: Box<ScanJob>,
        source: JobQueueError,
    },

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

/// Accepts new jobs and answers queries about existing ones.
pub struct ScanDispatcher {
    registry: Arc<HandlerRegistry>,
    workflow: Arc<JobWorkflow>,
    queue: JobQueueHandle,
}

impl ScanDispatcher {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        workflow: Arc<JobWorkflow>,
        queue: JobQueueHandle,
    ) -> Self {
        Self {
            registry,
            workflow,
            queue,
        }
    }

    /// Validate, record and enqueue a scan.
    ///
    /// Returns as soon as the job is queued; the returned record is `Pending`.
    pub async fn submit(&self, request: ScanRequest) -> Result<ScanJob, SubmitError> {
        let target = request.target.trim().to_string();
        if target.is_empty() {
            return Err(ScanValidationError::EmptyTarget.into());
        }

        let new_job = NewScanJob {
            target,
            scan_type: request.scan_type,
            options: request.options,
            owner: request.owner,
        };

        let handler = match self.registry.resolve(new_job.scan_type) {
            Ok(handler) => handler,
            Err(not_found) => {
                let job = self.workflow.create_job(new_job).await?;
                let job = self.workflow.fail_job(job.id, not_found.to_string()).await?;
                return Err(SubmitError::Unsupported(Box::new(job)));
            }
        };

        handler.validate(&new_job.target, &new_job.options)?;

        let scan_type = new_job.scan_type;
        let job = self.workflow.create_job(new_job).await?;

        if let Err(source) = self.queue.enqueue(QueuedJob {
            job_id: job.id,
            scan_type,
        }) {
            warn!(job_id = %job.id, scan_type = %scan_type, error = %source, "Failed to enqueue job");
            let job = self.workflow.fail_job(job.id, source.to_string()).await?;
            return Err(SubmitError::QueueUnavailable {
                job: Box::new(job),
                source,
            });
        }

        info!(job_id = %job.id, scan_type = %scan_type, "Job queued");
        Ok(job)
    }

    pub async fn get(&self, id: Uuid) -> Result<ScanJob, JobStoreError> {
        self.workflow.job_store().get(id).await
    }

    /// Jobs of `owner`, newest first
    pub async fn list(
        &self,
        owner: &OwnerId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ScanJob>, JobStoreError> {
        self.workflow.job_store().list(owner, offset, limit).await
    }

    /// Remove a job record. A running job keeps executing; its outcome is discarded.
    pub async fn remove(&self, id: Uuid, owner: &OwnerId) -> Result<(), JobStoreError> {
        self.workflow.job_store().delete(id, owner).await?;
        info!(job_id = %id, owner = %owner, "Job removed");
        Ok(())
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }
}
