//! SQLx implementation of the job store

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use auditor_core::config::DatabaseConfig;

use super::store::{JobStore, JobStoreError};
use crate::domain::{JobTransitionError, NewScanJob, OwnerId, ScanJob, StatusChange};

const SELECT_COLUMNS: &str = "id, owner_id, target, scan_type, options, status, created_at, \
     started_at, completed_at, result, error, transitions";

#[derive(sqlx::FromRow)]
struct ScanJobRow {
    id: Uuid,
    owner_id: String,
    target: String,
    scan_type: String,
    options: serde_json::Value,
    status: String,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    result: Option<serde_json::Value>,
    error: Option<String>,
    transitions: serde_json::Value,
}

impl TryFrom<ScanJobRow> for ScanJob {
    type Error = JobStoreError;

    fn try_from(row: ScanJobRow) -> Result<Self, Self::Error> {
        Ok(ScanJob {
            id: row.id,
            target: row.target,
            scan_type: row
                .scan_type
                .parse()
                .map_err(|e: auditor_core::domain::scan::ScanTypeParseError| {
                    JobStoreError::Serialization(e.to_string())
                })?,
            options: from_json(row.options)?,
            owner: OwnerId::new(row.owner_id),
            status: row.status.parse().map_err(JobStoreError::Serialization)?,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            result: row.result.map(from_json).transpose()?,
            error: row.error,
            transitions: from_json(row.transitions)?,
        })
    }
}

fn from_json<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, JobStoreError> {
    serde_json::from_value(value).map_err(|e| JobStoreError::Serialization(e.to_string()))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, JobStoreError> {
    serde_json::to_value(value).map_err(|e| JobStoreError::Serialization(e.to_string()))
}

fn database_error(operation: &'static str) -> impl Fn(sqlx::Error) -> JobStoreError {
    move |e| {
        tracing::error!(error = %e, "Database error {}", operation);
        JobStoreError::Database(e.to_string())
    }
}

/// PostgreSQL-backed job store
pub struct PostgresJobStore {
    pool: Arc<PgPool>,
}

impl PostgresJobStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Open a connection pool for the configured database
    pub async fn connect(config: &DatabaseConfig, url: &str) -> Result<Self, JobStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect(url)
            .await
            .map_err(database_error("connecting to job database"))?;

        Ok(Self::new(Arc::new(pool)))
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> Result<(), JobStoreError> {
        sqlx::migrate!("./migrations")
            .run(&*self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Job store migration failed");
                JobStoreError::Database(e.to_string())
            })
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn create(&self, new_job: NewScanJob) -> Result<ScanJob, JobStoreError> {
        let job = ScanJob::new(new_job);

        sqlx::query(
            r#"
            INSERT INTO scan_jobs (
                id, owner_id, target, scan_type, options, status, created_at, transitions
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(job.id)
        .bind(job.owner.as_str())
        .bind(&job.target)
        .bind(job.scan_type.as_str())
        .bind(to_json(&job.options)?)
        .bind(job.status.as_str())
        .bind(job.created_at)
        .bind(to_json(&job.transitions)?)
        .execute(&*self.pool)
        .await
        .map_err(database_error("creating job"))?;

        tracing::debug!(job_id = %job.id, "Job created in database");
        Ok(job)
    }

    async fn get(&self, id: Uuid) -> Result<ScanJob, JobStoreError> {
        let row: Option<ScanJobRow> = sqlx::query_as(&format!(
            "SELECT {} FROM scan_jobs WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(database_error("fetching job"))?;

        row.ok_or(JobStoreError::NotFound(id))?.try_into()
    }

    async fn list(
        &self,
        owner: &OwnerId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ScanJob>, JobStoreError> {
        let rows: Vec<ScanJobRow> = sqlx::query_as(&format!(
            "SELECT {} FROM scan_jobs WHERE owner_id = $1 \
             ORDER BY created_at DESC, seq DESC LIMIT $2 OFFSET $3",
            SELECT_COLUMNS
        ))
        .bind(owner.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&*self.pool)
        .await
        .map_err(database_error("listing jobs"))?;

        rows.into_iter().map(ScanJob::try_from).collect()
    }

    async fn transition(&self, id: Uuid, change: StatusChange) -> Result<ScanJob, JobStoreError> {
        let mut job = self.get(id).await?;
        let previous = job.status;
        job.apply(change)?;

        // Compare-and-set on the status read above
        let outcome = sqlx::query(
            r#"
            UPDATE scan_jobs
            SET status = $2, started_at = $3, completed_at = $4, result = $5, error = $6,
                transitions = $7
            WHERE id = $1 AND status = $8
            "#,
        )
        .bind(id)
        .bind(job.status.as_str())
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(job.result.as_ref().map(to_json).transpose()?)
        .bind(&job.error)
        .bind(to_json(&job.transitions)?)
        .bind(previous.as_str())
        .execute(&*self.pool)
        .await
        .map_err(database_error("updating job status"))?;

        if outcome.rows_affected() == 0 {
            // Deleted or moved on by another writer since the read
            let current = self.get(id).await?;
            return Err(JobTransitionError {
                from: current.status,
                to: job.status,
            }
            .into());
        }

        Ok(job)
    }

    async fn delete(&self, id: Uuid, owner: &OwnerId) -> Result<(), JobStoreError> {
        let outcome = sqlx::query("DELETE FROM scan_jobs WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner.as_str())
            .execute(&*self.pool)
            .await
            .map_err(database_error("deleting job"))?;

        if outcome.rows_affected() == 0 {
            return Err(JobStoreError::NotFound(id));
        }
        Ok(())
    }
}
