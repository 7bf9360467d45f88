use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{JobTransitionError, NewScanJob, OwnerId, ScanJob, StatusChange};

/// Job persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),
    #[error(transparent)]
    InvalidTransition(#[from] JobTransitionError),
    #[error("Serialization failed: {0}")]
    Serialization(String),
    #[error("Database operation failed: {0}")]
    Database(String),
}

/// Job storage interface.
///
/// `create` and `transition` are the only ways a job record changes. A
/// `transition` is atomic per job: it is checked against the job's current
/// status and applied in the same step, so two writers can never both move a
/// job into a terminal state.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new job in `Pending`
    async fn create(&self, new_job: NewScanJob) -> Result<ScanJob, JobStoreError>;

    async fn get(&self, id: Uuid) -> Result<ScanJob, JobStoreError>;

    /// Jobs of one owner, newest first
    async fn list(
        &self,
        owner: &OwnerId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ScanJob>, JobStoreError>;

    /// Apply a status change and return the updated job
    async fn transition(&self, id: Uuid, change: StatusChange) -> Result<ScanJob, JobStoreError>;

    /// Remove a job. A job owned by someone else is reported as not found.
    async fn delete(&self, id: Uuid, owner: &OwnerId) -> Result<(), JobStoreError>;
}
