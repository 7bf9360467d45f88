//! In-process job store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{JobStore, JobStoreError};
use crate::domain::{NewScanJob, OwnerId, ScanJob, StatusChange};

struct StoredJob {
    /// Insertion order, breaks ties between equal creation timestamps
    seq: u64,
    job: ScanJob,
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<Uuid, StoredJob>,
    next_seq: u64,
}

/// Job store kept in memory; records are lost on restart.
#[derive(Default)]
pub struct InMemoryJobStore {
    inner: RwLock<Inner>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.jobs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, new_job: NewScanJob) -> Result<ScanJob, JobStoreError> {
        let job = ScanJob::new(new_job);

        let mut inner = self.inner.write().await;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.jobs.insert(
            job.id,
            StoredJob {
                seq,
                job: job.clone(),
            },
        );

        tracing::debug!(job_id = %job.id, "Job created in memory store");
        Ok(job)
    }

    async fn get(&self, id: Uuid) -> Result<ScanJob, JobStoreError> {
        self.inner
            .read()
            .await
            .jobs
            .get(&id)
            .map(|stored| stored.job.clone())
            .ok_or(JobStoreError::NotFound(id))
    }

    async fn list(
        &self,
        owner: &OwnerId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ScanJob>, JobStoreError> {
        let inner = self.inner.read().await;
        let mut owned: Vec<&StoredJob> = inner
            .jobs
            .values()
            .filter(|stored| stored.job.is_owned_by(owner))
            .collect();

        owned.sort_by(|a, b| {
            b.job
                .created_at
                .cmp(&a.job.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });

        Ok(owned
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|stored| stored.job.clone())
            .collect())
    }

    async fn transition(&self, id: Uuid, change: StatusChange) -> Result<ScanJob, JobStoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner.jobs.get_mut(&id).ok_or(JobStoreError::NotFound(id))?;

        // Checked and applied under the same write lock
        stored.job.apply(change)?;
        Ok(stored.job.clone())
    }

    async fn delete(&self, id: Uuid, owner: &OwnerId) -> Result<(), JobStoreError> {
        let mut inner = self.inner.write().await;
        match inner.jobs.get(&id) {
            Some(stored) if stored.job.is_owned_by(owner) => {
                inner.jobs.remove(&id);
                Ok(())
            }
            _ => Err(JobStoreError::NotFound(id)),
        }
    }
}
