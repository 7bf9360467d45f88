//! Direct recon calls: run a handler inline and return its result without a job record

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use auditor_core::config::DispatchConfig;
use auditor_core::domain::scan::{
    ScanContext, ScanExecutionError, ScanOptions, ScanResult, ScanType, ScanValidationError,
};

use crate::infrastructure::handler_registry::{HandlerNotFound, HandlerRegistry};
use crate::infrastructure::job_queue::execute_with_deadline;

/// Why a direct recon call produced no result
#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    #[error(transparent)]
    Validation(#[from] ScanValidationError),

    #[error(transparent)]
    Unsupported(#[from] HandlerNotFound),

    #[error(transparent)]
    Execution(#[from] ScanExecutionError),
}

/// Runs registered handlers for callers that wait on the answer.
///
/// Each call gets the deadline of its scan type's lane, optionally capped by
/// [`ReconRunner::with_time_limit`]. Calls bypass the job queue, so they do
/// not count against lane concurrency.
pub struct ReconRunner {
    registry: Arc<HandlerRegistry>,
    dispatch: DispatchConfig,
    time_limit: Option<Duration>,
}

impl ReconRunner {
    pub fn new(registry: Arc<HandlerRegistry>, dispatch: DispatchConfig) -> Self {
        Self {
            registry,
            dispatch,
            time_limit: None,
        }
    }

    /// Cap every call's deadline, e.g. below the HTTP request timeout
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Time budget a call of `scan_type` runs under
    pub fn budget(&self, scan_type: ScanType) -> Duration {
        let lane = self.dispatch.lane(scan_type).job_timeout();
        match self.time_limit {
            Some(limit) => lane.min(limit),
            None => lane,
        }
    }

    pub async fn run(
        &self,
        scan_type: ScanType,
        target: &str,
        options: ScanOptions,
    ) -> Result<ScanResult, ReconError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(ScanValidationError::EmptyTarget.into());
        }

        let handler = self.registry.resolve(scan_type)?;
        handler.validate(target, &options)?;

        let context = ScanContext::new(Uuid::new_v4(), target, options, self.budget(scan_type));
        let call_id = context.job_id;
        info!(call_id = %call_id, scan_type = %scan_type, scan_target = %target, "Running direct recon call");

        match execute_with_deadline(handler, context).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(call_id = %call_id, scan_type = %scan_type, error = %e, "Direct recon call failed");
                Err(e.into())
            }
        }
    }
}
