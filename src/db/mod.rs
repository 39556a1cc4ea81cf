use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use uuid::Uuid;

use crate::models::job::{ImportJob, ImportJobStatus, NewImportJob};
use crate::models::person::PersonRecord;

pub mod memory;
pub mod person_queries;
pub mod queries;

/// Initialize PostgreSQL connection pool
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Import job with id {0} not found")]
    JobNotFound(Uuid),

    #[error("Import job {id} cannot move from {from} to {to}")]
    IllegalTransition {
        id: Uuid,
        from: ImportJobStatus,
        to: ImportJobStatus,
    },

    #[error("Conflicting person record: {0}")]
    Conflict(String),

    #[error("Corrupt row in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },
}

/// Durable records of import jobs.
///
/// Every transition is its own unit of work, committed independently of the
/// import transaction, and is refused unless the job's current status allows it.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job in `PENDING`. Durable once this returns.
    async fn create(&self, new_job: NewImportJob) -> Result<ImportJob, StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<ImportJob>, StoreError>;

    /// `PENDING -> IN_PROGRESS`: stamps `started_at`, clears any stale outcome.
    async fn mark_in_progress(&self, id: Uuid) -> Result<(), StoreError>;

    /// `IN_PROGRESS -> COMPLETED` with both record counts set to `records`.
    async fn mark_completed(&self, id: Uuid, records: i32) -> Result<(), StoreError>;

    /// `-> FAILED` with counts cleared and the message truncated.
    async fn mark_failed(&self, id: Uuid, message: &str) -> Result<(), StoreError>;

    /// Connectivity check for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Entry point to the person tables used by the import transaction.
#[async_trait]
pub trait PersonStore: Send + Sync {
    /// Open the import transaction.
    async fn begin(&self) -> Result<Box<dyn PersonBatchWriter>, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;
}

/// One open import transaction. Nothing written through it is visible to
/// other readers until `commit`; `rollback` (or dropping it) discards it all.
#[async_trait]
pub trait PersonBatchWriter: Send {
    async fn insert_batch(&mut self, batch: &[PersonRecord]) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
