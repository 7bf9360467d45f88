use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use auditor_core::config::{DispatchConfig, LaneConfig};
use auditor_core::domain::scan::{
    ScanContext, ScanExecutionError, ScanHandler, ScanResult, ScanType,
};

use crate::application::workflow::{JobWorkflow, WorkflowError};
use crate::infrastructure::handler_registry::HandlerRegistry;

/// Message delivered to a lane when a new scan job is queued.
///
/// Only the id travels through the lane; the worker reads the job record
/// when it takes ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedJob {
    pub job_id: Uuid,
    pub scan_type: ScanType,
}

/// Errors that can occur when enqueuing a job.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum JobQueueError {
    #[error("Scan queue for {0} is full")]
    LaneFull(ScanType),
    #[error("Scan queue for {0} is closed")]
    LaneClosed(ScanType),
    #[error("No scan queue for {0}")]
    NoLane(ScanType),
}

/// Handle that lets the dispatcher push jobs onto their lanes.
#[derive(Clone)]
pub struct JobQueueHandle {
    lanes: Arc<HashMap<ScanType, mpsc::Sender<QueuedJob>>>,
}

impl JobQueueHandle {
    /// Put a job on its lane without waiting for room.
    pub fn enqueue(&self, job: QueuedJob) -> Result<(), JobQueueError> {
        let lane = self
            .lanes
            .get(&job.scan_type)
            .ok_or(JobQueueError::NoLane(job.scan_type))?;

        lane.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => JobQueueError::LaneFull(job.scan_type),
            mpsc::error::TrySendError::Closed(_) => JobQueueError::LaneClosed(job.scan_type),
        })
    }

    pub fn has_lane(&self, scan_type: ScanType) -> bool {
        self.lanes.contains_key(&scan_type)
    }
}

/// Receiving end of one lane together with its limits
pub struct LaneReceiver {
    pub scan_type: ScanType,
    pub config: LaneConfig,
    receiver: mpsc::Receiver<QueuedJob>,
}

/// Create one bounded lane per scan type.
pub fn job_lanes(
    scan_types: impl IntoIterator<Item = ScanType>,
    dispatch: &DispatchConfig,
) -> (JobQueueHandle, Vec<LaneReceiver>) {
    let mut senders = HashMap::new();
    let mut receivers = Vec::new();

    for scan_type in scan_types {
        if senders.contains_key(&scan_type) {
            continue;
        }
        let config = dispatch.lane(scan_type).clone();
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        senders.insert(scan_type, sender);
        receivers.push(LaneReceiver {
            scan_type,
            config,
            receiver,
        });
    }

    (
        JobQueueHandle {
            lanes: Arc::new(senders),
        },
        receivers,
    )
}

/// Shared dependencies required by the job workers.
#[derive(Clone)]
pub struct JobWorkerContext {
    pub workflow: Arc<JobWorkflow>,
    pub registry: Arc<HandlerRegistry>,
}

/// Running worker pool
pub struct JobWorkerPool {
    lane_tasks: Vec<JoinHandle<()>>,
    jobs: TaskTracker,
}

impl JobWorkerPool {
    /// Wait for the lane loops to stop, then give in-flight jobs up to `grace`
    /// to finish. Returns `false` if some jobs were still running.
    ///
    /// Call after cancelling the token passed to [`spawn_job_worker_pool`].
    pub async fn shutdown(self, grace: Duration) -> bool {
        for task in self.lane_tasks {
            if let Err(err) = task.await {
                error!(error = %err, "Lane worker task ended abnormally");
            }
        }

        self.jobs.close();
        let in_flight = self.jobs.len();
        if in_flight == 0 {
            return true;
        }

        info!(in_flight, "Waiting for in-flight scan jobs");
        match tokio::time::timeout(grace, self.jobs.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    in_flight = self.jobs.len(),
                    "Shutdown grace period elapsed with scan jobs still running"
                );
                false
            }
        }
    }
}

/// Spawn one worker loop per lane.
///
/// Each lane has its own semaphore, so a burst on one scan type never holds
/// back another. The loops stop dequeuing once `shutdown` is cancelled; jobs
/// already running are left to finish.
pub fn spawn_job_worker_pool(
    context: JobWorkerContext,
    lanes: Vec<LaneReceiver>,
    shutdown: CancellationToken,
) -> JobWorkerPool {
    let jobs = TaskTracker::new();

    let lane_tasks = lanes
        .into_iter()
        .map(|lane| {
            let context = context.clone();
            let jobs = jobs.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(run_lane(context, lane, jobs, shutdown))
        })
        .collect();

    JobWorkerPool { lane_tasks, jobs }
}

async fn run_lane(
    context: JobWorkerContext,
    mut lane: LaneReceiver,
    jobs: TaskTracker,
    shutdown: CancellationToken,
) {
    let scan_type = lane.scan_type;
    let concurrency = lane.config.max_concurrent_jobs.max(1);
    let job_timeout = lane.config.job_timeout();
    let semaphore = Arc::new(Semaphore::new(concurrency));

    info!(lane = %scan_type, concurrency, "Job worker lane started");

    loop {
        // Wait for a permit before taking a job off the lane
        let permit = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(err) => {
                    error!(lane = %scan_type, error = %err, "Failed to acquire concurrency permit for job processing");
                    break;
                }
            },
        };

        let queued = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            queued = lane.receiver.recv() => match queued {
                Some(queued) => queued,
                None => break,
            },
        };

        let ctx = context.clone();
        let span = info_span!("scan_job", job_id = %queued.job_id, scan_type = %scan_type);
        jobs.spawn(
            async move {
                process_job(ctx, queued, job_timeout).await;
                drop(permit);
            }
            .instrument(span),
        );
    }

    let left = lane.receiver.len();
    if left > 0 {
        warn!(lane = %scan_type, queued = left, "Job worker lane exiting with jobs still queued");
    } else {
        info!(lane = %scan_type, "Job worker lane exiting");
    }
}

async fn process_job(ctx: JobWorkerContext, queued: QueuedJob, job_timeout: Duration) {
    let job = match ctx.workflow.start_job(queued.job_id).await {
        Ok(job) => job,
        Err(err) if err.is_not_found() => {
            info!("Job was removed before execution; skipping");
            return;
        }
        Err(err) => {
            error!(error = %err, "Failed to start job");
            return;
        }
    };

    let outcome = match ctx.registry.resolve(job.scan_type) {
        Ok(handler) => {
            let context = ScanContext::new(job.id, job.target, job.options, job_timeout);
            execute_with_deadline(handler, context).await
        }
        Err(err) => Err(ScanExecutionError::ExecutionFailed(err.to_string())),
    };

    let written = match outcome {
        Ok(result) => ctx.workflow.complete_job(job.id, result).await,
        Err(err) => {
            warn!(error = %err, "Scan execution failed");
            ctx.workflow.fail_job(job.id, err.public_message()).await
        }
    };

    match written {
        Ok(_) => {}
        Err(err) if err.is_not_found() => {
            info!("Job was removed while running; outcome discarded");
        }
        Err(WorkflowError::InvalidTransition(err)) => {
            error!(error = %err, "Job was already finished by another writer");
        }
        Err(err) => {
            error!(error = %err, "Failed to record job outcome");
        }
    }
}

/// Run a handler on its own task, bounded by the job deadline.
///
/// A panic inside the handler surfaces as `ExecutionFailed`, a missed deadline
/// as `Timeout`. The handler task is aborted once the deadline passes.
pub async fn execute_with_deadline(
    handler: Arc<dyn ScanHandler>,
    context: ScanContext,
) -> Result<ScanResult, ScanExecutionError> {
    let deadline = context.deadline;
    let expected = handler.scan_type();
    let mut task = tokio::spawn(async move { handler.execute(&context).await });

    match tokio::time::timeout_at(deadline, &mut task).await {
        Ok(Ok(Ok(result))) if result.scan_type() == expected => Ok(result),
        Ok(Ok(Ok(result))) => Err(ScanExecutionError::ExecutionFailed(format!(
            "{} handler returned a {} result",
            expected,
            result.scan_type()
        ))),
        Ok(Ok(Err(err))) => Err(err),
        Ok(Err(join_error)) => {
            error!(error = %join_error, "Scan handler task panicked or was cancelled");
            Err(ScanExecutionError::ExecutionFailed(join_error.to_string()))
        }
        Err(_) => {
            task.abort();
            Err(ScanExecutionError::Timeout)
        }
    }
}
