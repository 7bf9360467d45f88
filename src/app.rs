//! Application setup and wiring

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio_util::sync::CancellationToken;

use auditor_core::Config;
use auditor_core::domain::scan::ScanHandler;
use auditor_orchestrator::application::{JobWorkflow, ReconRunner, ScanDispatcher};
use auditor_orchestrator::infrastructure::{
    HandlerRegistry, InMemoryJobStore, JobStore, JobWorkerContext, JobWorkerPool,
    PostgresJobStore, job_lanes, spawn_job_worker_pool,
};
use auditor_orchestrator::presentation::{ScanApiState, create_router};
use auditor_recon::default_handlers;

/// Handle returned from create_app for graceful shutdown coordination
pub struct AppHandle {
    pub router: Router,
    pub shutdown_token: CancellationToken,
    pub worker_pool: JobWorkerPool,
}

/// Build the application with the built-in recon handlers
pub async fn create_app(
    config: Config,
) -> Result<AppHandle, Box<dyn std::error::Error + Send + Sync>> {
    let handlers = default_handlers(&config.recon);
    create_app_with_handlers(config, handlers).await
}

/// Build the application around an explicit handler set.
///
/// Jobs are persisted in PostgreSQL when `database.url` is configured and
/// kept in memory otherwise.
pub async fn create_app_with_handlers(
    config: Config,
    handlers: Vec<Arc<dyn ScanHandler>>,
) -> Result<AppHandle, Box<dyn std::error::Error + Send + Sync>> {
    let registry: Arc<HandlerRegistry> = Arc::new(handlers.into_iter().collect());
    tracing::info!(
        scan_types = ?registry.registered_types(),
        "Registered scan handlers"
    );

    let job_store: Arc<dyn JobStore> = match config.database.url.as_deref() {
        Some(url) => {
            let store = PostgresJobStore::connect(&config.database, url).await?;
            if config.database.run_migrations {
                store.migrate().await?;
                tracing::info!("Database migrations applied");
            }
            tracing::info!("Using PostgreSQL job store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; jobs are kept in memory and lost on restart");
            Arc::new(InMemoryJobStore::new())
        }
    };

    let workflow = Arc::new(JobWorkflow::new(job_store));
    let (queue, lanes) = job_lanes(registry.registered_types(), &config.dispatch);

    let shutdown_token = CancellationToken::new();
    let worker_pool = spawn_job_worker_pool(
        JobWorkerContext {
            workflow: workflow.clone(),
            registry: registry.clone(),
        },
        lanes,
        shutdown_token.clone(),
    );

    // Direct recon calls must answer before the HTTP timeout layer gives up
    let request_timeout = Duration::from_secs(config.server.request_timeout_seconds);
    let recon = Arc::new(
        ReconRunner::new(registry.clone(), config.dispatch.clone())
            .with_time_limit(request_timeout.saturating_sub(Duration::from_secs(1))),
    );

    let dispatcher = Arc::new(ScanDispatcher::new(registry, workflow, queue));
    let router = create_router(ScanApiState { dispatcher, recon }, &config.server);

    Ok(AppHandle {
        router,
        shutdown_token,
        worker_pool,
    })
}
