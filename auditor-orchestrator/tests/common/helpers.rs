//! Test harness wiring a dispatcher, in-memory store and worker pool

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use auditor_core::config::DispatchConfig;
use auditor_core::domain::scan::{ScanHandler, ScanOptions, ScanType};
use auditor_orchestrator::application::{JobWorkflow, ReconRunner, ScanDispatcher, ScanRequest};
use auditor_orchestrator::domain::{JobStatus, OwnerId, ScanJob};
use auditor_orchestrator::infrastructure::{
    HandlerRegistry, InMemoryJobStore, JobStore, JobWorkerContext, JobWorkerPool, job_lanes,
    spawn_job_worker_pool,
};

pub struct Harness {
    pub dispatcher: Arc<ScanDispatcher>,
    pub recon: Arc<ReconRunner>,
    pub store: Arc<InMemoryJobStore>,
    pub shutdown: CancellationToken,
    pub pool: JobWorkerPool,
}

pub fn harness(handlers: Vec<Arc<dyn ScanHandler>>, dispatch: DispatchConfig) -> Harness {
    let registry: Arc<HandlerRegistry> = Arc::new(handlers.into_iter().collect());
    let store = Arc::new(InMemoryJobStore::new());
    let workflow = Arc::new(JobWorkflow::new(store.clone()));

    let (queue, lanes) = job_lanes(registry.registered_types(), &dispatch);
    let shutdown = CancellationToken::new();
    let pool = spawn_job_worker_pool(
        JobWorkerContext {
            workflow: workflow.clone(),
            registry: registry.clone(),
        },
        lanes,
        shutdown.clone(),
    );

    Harness {
        recon: Arc::new(ReconRunner::new(registry.clone(), dispatch)),
        dispatcher: Arc::new(ScanDispatcher::new(registry, workflow, queue)),
        store,
        shutdown,
        pool,
    }
}

pub fn request(target: &str, scan_type: ScanType) -> ScanRequest {
    ScanRequest {
        target: target.to_string(),
        scan_type,
        options: ScanOptions::default(),
        owner: OwnerId::new("alice"),
    }
}

/// Poll the store until the job reaches `status`
pub async fn wait_for_status(store: &InMemoryJobStore, id: Uuid, status: JobStatus) -> ScanJob {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let job = store.get(id).await.expect("job exists");
        if job.status == status {
            return job;
        }
        assert!(
            !job.status.is_terminal(),
            "job reached {} while waiting for {}",
            job.status,
            status
        );
        assert!(
            tokio::time::Instant::now() < deadline,
            "job stuck in {} while waiting for {}",
            job.status,
            status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll the store until the job is terminal
pub async fn wait_for_terminal(store: &InMemoryJobStore, id: Uuid) -> ScanJob {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let job = store.get(id).await.expect("job exists");
        if job.status.is_terminal() {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job stuck in {}",
            job.status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Every recorded transition follows the state machine and ends at the current status
pub fn assert_consistent(job: &ScanJob) {
    let mut current = JobStatus::Pending;
    for transition in &job.transitions {
        assert_eq!(transition.from, current);
        assert!(transition.from.can_transition_to(&transition.to));
        current = transition.to;
    }
    assert_eq!(current, job.status);

    match job.status {
        JobStatus::Completed => {
            assert!(job.result.is_some() && job.error.is_none());
            assert!(job.completed_at.is_some());
        }
        JobStatus::Failed => {
            assert!(job.error.is_some() && job.result.is_none());
            assert!(job.completed_at.is_some());
        }
        JobStatus::Pending | JobStatus::Running => {
            assert!(job.result.is_none() && job.error.is_none());
            assert!(job.completed_at.is_none());
        }
    }
}
