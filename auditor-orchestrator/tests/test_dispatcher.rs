//! Submission, lanes and worker execution against stub handlers

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use auditor_core::config::{DispatchConfig, LaneConfig};
use auditor_core::domain::scan::{ScanOptions, ScanResult, ScanType, ScanValidationError};
use auditor_orchestrator::application::SubmitError;
use auditor_orchestrator::domain::{JobStatus, OwnerId};
use auditor_orchestrator::infrastructure::{JobQueueError, JobStore, JobStoreError};

use common::fixtures::{Behavior, StubHandler};
use common::helpers::{assert_consistent, harness, request, wait_for_status, wait_for_terminal};

#[tokio::test]
async fn test_submitted_job_runs_to_completion() {
    let h = harness(
        vec![StubHandler::new(ScanType::Subdomain, Behavior::Succeed)],
        DispatchConfig::default(),
    );

    let job = h
        .dispatcher
        .submit(request("example.com", ScanType::Subdomain))
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.result.is_none());

    let finished = wait_for_terminal(&h.store, job.id).await;
    assert_eq!(finished.status, JobStatus::Completed);
    assert_consistent(&finished);
    assert!(finished.started_at.is_some());

    let Some(ScanResult::Subdomain(result)) = finished.result else {
        panic!("unexpected result variant");
    };
    assert!(result.live_subdomains.is_subset(&result.subdomains));
}

#[tokio::test]
async fn test_unsupported_scan_type_fails_without_running() {
    let h = harness(
        vec![StubHandler::new(ScanType::Subdomain, Behavior::Succeed)],
        DispatchConfig::default(),
    );

    let err = h
        .dispatcher
        .submit(request("example.com", ScanType::Xss))
        .await
        .unwrap_err();
    let SubmitError::Unsupported(job) = err else {
        panic!("expected unsupported, got {:?}", err);
    };
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("Unsupported scan type: xss"));

    // Visible via query, failed straight from pending
    let stored = h.dispatcher.get(job.id).await.unwrap();
    assert_consistent(&stored);
    assert_eq!(stored.transitions.len(), 1);
    assert_eq!(stored.transitions[0].from, JobStatus::Pending);
    assert!(stored.started_at.is_none());
}

#[tokio::test]
async fn test_validation_errors_create_no_job() {
    let h = harness(
        vec![StubHandler::new(ScanType::PortScan, Behavior::Succeed)],
        DispatchConfig::default(),
    );

    let err = h
        .dispatcher
        .submit(request("   ", ScanType::PortScan))
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::Validation(ScanValidationError::EmptyTarget)));

    let mut bad_ports = request("10.0.0.1", ScanType::PortScan);
    bad_ports.options = ScanOptions {
        ports: Some("bad".to_string()),
        ..Default::default()
    };
    let err = h.dispatcher.submit(bad_ports).await.unwrap_err();
    assert!(matches!(
        err,
        SubmitError::Validation(ScanValidationError::InvalidPortSpec(_))
    ));

    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn test_target_is_trimmed_before_recording() {
    let h = harness(
        vec![StubHandler::new(ScanType::TechStack, Behavior::Succeed)],
        DispatchConfig::default(),
    );
    let job = h
        .dispatcher
        .submit(request("  example.com\n", ScanType::TechStack))
        .await
        .unwrap();
    assert_eq!(job.target, "example.com");
}

#[tokio::test]
async fn test_handler_error_fails_job() {
    let h = harness(
        vec![StubHandler::new(
            ScanType::PortScan,
            Behavior::Fail("no such host".to_string()),
        )],
        DispatchConfig::default(),
    );

    let job = h
        .dispatcher
        .submit(request("nowhere.invalid", ScanType::PortScan))
        .await
        .unwrap();
    let finished = wait_for_terminal(&h.store, job.id).await;
    assert_eq!(finished.status, JobStatus::Failed);
    assert_eq!(finished.error.as_deref(), Some("Invalid target: no such host"));
    assert_consistent(&finished);
}

#[tokio::test]
async fn test_panicking_handler_fails_with_redacted_message() {
    let h = harness(
        vec![StubHandler::new(ScanType::TechStack, Behavior::Panic)],
        DispatchConfig::default(),
    );

    let job = h
        .dispatcher
        .submit(request("example.com", ScanType::TechStack))
        .await
        .unwrap();
    let finished = wait_for_terminal(&h.store, job.id).await;
    assert_eq!(finished.status, JobStatus::Failed);
    assert_eq!(finished.error.as_deref(), Some("scan execution failed"));
    assert_consistent(&finished);

    // The lane keeps serving after a panic
    let next = h
        .dispatcher
        .submit(request("example.org", ScanType::TechStack))
        .await
        .unwrap();
    assert_eq!(wait_for_terminal(&h.store, next.id).await.status, JobStatus::Failed);
}

#[tokio::test]
async fn test_mismatched_result_variant_fails_job() {
    let h = harness(
        vec![StubHandler::new(ScanType::Subdomain, Behavior::WrongVariant)],
        DispatchConfig::default(),
    );

    let job = h
        .dispatcher
        .submit(request("example.com", ScanType::Subdomain))
        .await
        .unwrap();
    let finished = wait_for_terminal(&h.store, job.id).await;
    assert_eq!(finished.status, JobStatus::Failed);
    assert_eq!(finished.error.as_deref(), Some("scan execution failed"));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_exceeded_fails_with_timeout() {
    let dispatch = DispatchConfig {
        port_scan: LaneConfig::new(1, 4, 1),
        ..DispatchConfig::default()
    };
    let h = harness(
        vec![StubHandler::new(
            ScanType::PortScan,
            Behavior::Sleep(Duration::from_secs(600)),
        )],
        dispatch,
    );

    let job = h
        .dispatcher
        .submit(request("10.0.0.1", ScanType::PortScan))
        .await
        .unwrap();
    let finished = wait_for_terminal(&h.store, job.id).await;
    assert_eq!(finished.status, JobStatus::Failed);
    assert_eq!(finished.error.as_deref(), Some("timeout"));
    assert_consistent(&finished);
}

#[tokio::test]
async fn test_slow_lane_does_not_delay_other_lanes() {
    let gate = Arc::new(Semaphore::new(0));
    let dispatch = DispatchConfig {
        subdomain: LaneConfig::new(1, 8, 60),
        ..DispatchConfig::default()
    };
    let h = harness(
        vec![
            StubHandler::new(ScanType::Subdomain, Behavior::Gated(gate.clone())),
            StubHandler::new(ScanType::PortScan, Behavior::Succeed),
        ],
        dispatch,
    );

    let slow = h
        .dispatcher
        .submit(request("example.com", ScanType::Subdomain))
        .await
        .unwrap();
    let queued_behind = h
        .dispatcher
        .submit(request("example.org", ScanType::Subdomain))
        .await
        .unwrap();
    wait_for_status(&h.store, slow.id, JobStatus::Running).await;

    let fast = h
        .dispatcher
        .submit(request("10.0.0.1", ScanType::PortScan))
        .await
        .unwrap();
    let fast = wait_for_terminal(&h.store, fast.id).await;
    assert_eq!(fast.status, JobStatus::Completed);

    // The subdomain lane is still saturated by its single slot
    assert_eq!(h.dispatcher.get(slow.id).await.unwrap().status, JobStatus::Running);
    assert_eq!(
        h.dispatcher.get(queued_behind.id).await.unwrap().status,
        JobStatus::Pending
    );

    gate.add_permits(2);
    assert_eq!(wait_for_terminal(&h.store, slow.id).await.status, JobStatus::Completed);
    assert_eq!(
        wait_for_terminal(&h.store, queued_behind.id).await.status,
        JobStatus::Completed
    );
}

#[tokio::test]
async fn test_full_lane_rejects_and_fails_job() {
    let gate = Arc::new(Semaphore::new(0));
    let dispatch = DispatchConfig {
        tech_stack: LaneConfig::new(1, 1, 60),
        ..DispatchConfig::default()
    };
    let h = harness(
        vec![StubHandler::new(ScanType::TechStack, Behavior::Gated(gate.clone()))],
        dispatch,
    );

    let running = h
        .dispatcher
        .submit(request("a.example.com", ScanType::TechStack))
        .await
        .unwrap();
    wait_for_status(&h.store, running.id, JobStatus::Running).await;

    let waiting = h
        .dispatcher
        .submit(request("b.example.com", ScanType::TechStack))
        .await
        .unwrap();

    let err = h
        .dispatcher
        .submit(request("c.example.com", ScanType::TechStack))
        .await
        .unwrap_err();
    let SubmitError::QueueUnavailable { job, source } = err else {
        panic!("expected queue error, got {:?}", err);
    };
    assert_eq!(source, JobQueueError::LaneFull(ScanType::TechStack));
    assert_eq!(job.status, JobStatus::Failed);
    assert_consistent(&h.dispatcher.get(job.id).await.unwrap());

    gate.add_permits(2);
    assert_eq!(wait_for_terminal(&h.store, running.id).await.status, JobStatus::Completed);
    assert_eq!(wait_for_terminal(&h.store, waiting.id).await.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_deleting_running_job_discards_outcome() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(
        vec![StubHandler::new(ScanType::Subdomain, Behavior::Gated(gate.clone()))],
        DispatchConfig::default(),
    );
    let owner = OwnerId::new("alice");

    let job = h
        .dispatcher
        .submit(request("example.com", ScanType::Subdomain))
        .await
        .unwrap();
    wait_for_status(&h.store, job.id, JobStatus::Running).await;

    h.dispatcher.remove(job.id, &owner).await.unwrap();
    assert!(matches!(
        h.dispatcher.get(job.id).await,
        Err(JobStoreError::NotFound(_))
    ));

    // Let the worker finish, then drain the pool
    gate.add_permits(1);
    h.shutdown.cancel();
    assert!(h.pool.shutdown(Duration::from_secs(5)).await);

    assert!(h.store.is_empty().await);
    assert!(matches!(
        h.store.get(job.id).await,
        Err(JobStoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_remove_and_list_are_scoped_to_owner() {
    let h = harness(
        vec![StubHandler::new(ScanType::PortScan, Behavior::Succeed)],
        DispatchConfig::default(),
    );

    let mine = h
        .dispatcher
        .submit(request("10.0.0.1", ScanType::PortScan))
        .await
        .unwrap();
    let mut theirs = request("10.0.0.2", ScanType::PortScan);
    theirs.owner = OwnerId::new("bob");
    let theirs = h.dispatcher.submit(theirs).await.unwrap();

    let listed = h.dispatcher.list(&OwnerId::new("alice"), 0, 100).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, mine.id);

    assert!(matches!(
        h.dispatcher.remove(theirs.id, &OwnerId::new("alice")).await,
        Err(JobStoreError::NotFound(_))
    ));
    assert!(h.dispatcher.get(theirs.id).await.is_ok());
}

#[tokio::test]
async fn test_shutdown_stops_dequeuing() {
    let h = harness(
        vec![StubHandler::new(ScanType::PortScan, Behavior::Succeed)],
        DispatchConfig::default(),
    );

    h.shutdown.cancel();
    assert!(h.pool.shutdown(Duration::from_secs(1)).await);

    // Lanes are closed once the pool is gone
    let err = h
        .dispatcher
        .submit(request("10.0.0.1", ScanType::PortScan))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SubmitError::QueueUnavailable {
            source: JobQueueError::LaneClosed(ScanType::PortScan),
            ..
        }
    ));
}

#[tokio::test]
async fn test_concurrent_submissions_of_different_types_complete() {
    let h = harness(
        vec![
            StubHandler::new(ScanType::Subdomain, Behavior::Sleep(Duration::from_millis(50))),
            StubHandler::new(ScanType::PortScan, Behavior::Succeed),
        ],
        DispatchConfig::default(),
    );

    let (a, b) = tokio::join!(
        h.dispatcher.submit(request("example.com", ScanType::Subdomain)),
        h.dispatcher.submit(request("10.0.0.1", ScanType::PortScan)),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    for id in [a.id, b.id] {
        let job = wait_for_terminal(&h.store, id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_consistent(&job);
    }
}
