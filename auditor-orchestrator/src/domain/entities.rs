//! Scan job entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use auditor_core::domain::scan::{ScanOptions, ScanResult, ScanType};

use super::value_objects::{JobStatus, JobTransition, JobTransitionError, OwnerId};

/// One scan request and its tracked lifecycle
///
/// `result` is set only together with `Completed`, `error` only together with
/// `Failed`, and `completed_at` only on the terminal transition. All three are
/// written by [`ScanJob::apply`], which is the single mutation path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanJob {
    pub id: Uuid,
    pub target: String,
    pub scan_type: ScanType,
    pub options: ScanOptions,
    pub owner: OwnerId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<ScanResult>,
    pub error: Option<String>,
    #[serde(default)]
    pub transitions: Vec<JobTransition>,
}

/// Fields supplied by the caller when a job is created
#[derive(Debug, Clone)]
pub struct NewScanJob {
    pub target: String,
    pub scan_type: ScanType,
    pub options: ScanOptions,
    pub owner: OwnerId,
}

/// A requested status change together with its payload
#[derive(Debug, Clone)]
pub enum StatusChange {
    /// A worker took ownership of the job
    Start,
    Complete(ScanResult),
    Fail(String),
}

impl StatusChange {
    pub fn target_status(&self) -> JobStatus {
        match self {
            Self::Start => JobStatus::Running,
            Self::Complete(_) => JobStatus::Completed,
            Self::Fail(_) => JobStatus::Failed,
        }
    }
}

impl ScanJob {
    pub fn new(new_job: NewScanJob) -> Self {
        Self {
            id: Uuid::new_v4(),
            target: new_job.target,
            scan_type: new_job.scan_type,
            options: new_job.options,
            owner: new_job.owner,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
            transitions: Vec::new(),
        }
    }

    /// Apply a status change, enforcing the state machine.
    ///
    /// On error the job is left untouched.
    pub fn apply(&mut self, change: StatusChange) -> Result<(), JobTransitionError> {
        let now = Utc::now();
        match change {
            StatusChange::Start => {
                self.transition(JobStatus::Running, Some("Worker started execution".into()), now)?;
                self.started_at = Some(now);
            }
            StatusChange::Complete(result) => {
                self.transition(JobStatus::Completed, None, now)?;
                self.result = Some(result);
                self.completed_at = Some(now);
            }
            StatusChange::Fail(error) => {
                self.transition(JobStatus::Failed, Some(error.clone()), now)?;
                self.error = Some(error);
                self.completed_at = Some(now);
            }
        }
        Ok(())
    }

    fn transition(
        &mut self,
        to: JobStatus,
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<(), JobTransitionError> {
        if !self.status.can_transition_to(&to) {
            return Err(JobTransitionError {
                from: self.status,
                to,
            });
        }

        self.transitions.push(JobTransition {
            from: self.status,
            to,
            timestamp,
            reason,
        });
        self.status = to;
        Ok(())
    }

    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        &self.owner == owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditor_core::domain::scan::SubdomainResult;

    fn job() -> ScanJob {
        ScanJob::new(NewScanJob {
            target: "example.com".to_string(),
            scan_type: ScanType::Subdomain,
            options: ScanOptions::default(),
            owner: OwnerId::new("alice"),
        })
    }

    #[test]
    fn test_new_job_is_pending_without_payload() {
        let job = job();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.result.is_none() && job.error.is_none());
        assert!(job.completed_at.is_none());
        assert!(job.transitions.is_empty());
    }

    #[test]
    fn test_completion_sets_result_and_timestamps() {
        let mut job = job();
        job.apply(StatusChange::Start).unwrap();
        assert!(job.started_at.is_some());
        assert!(job.completed_at.is_none());

        job.apply(StatusChange::Complete(ScanResult::Subdomain(SubdomainResult::default())))
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.result.is_some());
        assert!(job.error.is_none());
        assert!(job.completed_at.is_some());
        assert_eq!(job.transitions.len(), 2);
    }

    #[test]
    fn test_second_terminal_write_is_rejected() {
        let mut job = job();
        job.apply(StatusChange::Start).unwrap();
        job.apply(StatusChange::Fail("timeout".to_string())).unwrap();
        let completed_at = job.completed_at;

        let err = job
            .apply(StatusChange::Complete(ScanResult::Subdomain(SubdomainResult::default())))
            .unwrap_err();
        assert_eq!(err.from, JobStatus::Failed);
        assert_eq!(err.to, JobStatus::Completed);

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.result.is_none());
        assert_eq!(job.error.as_deref(), Some("timeout"));
        assert_eq!(job.completed_at, completed_at);
    }

    #[test]
    fn test_pending_job_cannot_complete_directly() {
        let mut job = job();
        assert!(
            job.apply(StatusChange::Complete(ScanResult::Subdomain(SubdomainResult::default())))
                .is_err()
        );
        assert_eq!(job.status, JobStatus::Pending);
    }
}
