use async_trait::async_trait;
use sqlx::postgres::{PgQueryResult, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::db::{JobStore, StoreError};
use crate::models::job::{truncate_error_message, ImportJob, ImportJobStatus, NewImportJob};

const JOB_COLUMNS: &str = "id, file_name, file_size, content_type, status, total_records, \
     processed_records, error_message, created_at, started_at, finished_at";

/// Postgres-backed [`JobStore`].
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve why a guarded UPDATE touched nothing.
    async fn rejected_transition(&self, id: Uuid, to: ImportJobStatus) -> StoreError {
        match self.find(id).await {
            Ok(Some(job)) => StoreError::IllegalTransition {
                id,
                from: job.status,
                to,
            },
            Ok(None) => StoreError::JobNotFound(id),
            Err(e) => e,
        }
    }

    async fn check_transition(
        &self,
        id: Uuid,
        to: ImportJobStatus,
        result: PgQueryResult,
    ) -> Result<(), StoreError> {
        if result.rows_affected() == 0 {
            return Err(self.rejected_transition(id, to).await);
        }
        Ok(())
    }
}

fn predecessor_labels(target: ImportJobStatus) -> Vec<String> {
    ImportJobStatus::predecessors(target)
        .into_iter()
        .map(|status| status.to_string())
        .collect()
}

fn job_from_row(row: &PgRow) -> Result<ImportJob, StoreError> {
    let status_str: String = row.try_get("status")?;
    let status = status_str
        .parse::<ImportJobStatus>()
        .map_err(|_| StoreError::Corrupt {
            table: "import_jobs",
            reason: format!("unknown status '{}'", status_str),
        })?;

    Ok(ImportJob {
        id: row.try_get("id")?,
        file_name: row.try_get("file_name")?,
        file_size: row.try_get("file_size")?,
        content_type: row.try_get("content_type")?,
        status,
        total_records: row.try_get("total_records")?,
        processed_records: row.try_get("processed_records")?,
        error_message: row.try_get("error_message")?,
        created_at: row.try_get("created_at")?,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
    })
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, new_job: NewImportJob) -> Result<ImportJob, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO import_jobs (id, file_name, file_size, content_type, status)
            VALUES ($1, $2, $3, $4, 'PENDING')
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new_job.file_name)
        .bind(new_job.file_size)
        .bind(&new_job.content_type)
        .fetch_one(&self.pool)
        .await?;

        job_from_row(&row)
    }

    async fn find(&self, id: Uuid) -> Result<Option<ImportJob>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM import_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(job_from_row).transpose()
    }

    async fn mark_in_progress(&self, id: Uuid) -> Result<(), StoreError> {
        let to = ImportJobStatus::InProgress;
        let result = sqlx::query(
            r#"
            UPDATE import_jobs
            SET status = $2,
                started_at = NOW(),
                finished_at = NULL,
                error_message = NULL,
                processed_records = NULL,
                total_records = NULL
            WHERE id = $1 AND status = ANY($3)
            "#,
        )
        .bind(id)
        .bind(to.to_string())
        .bind(predecessor_labels(to))
        .execute(&self.pool)
        .await?;

        self.check_transition(id, to, result).await
    }

    async fn mark_completed(&self, id: Uuid, records: i32) -> Result<(), StoreError> {
        let to = ImportJobStatus::Completed;
        let result = sqlx::query(
            r#"
            UPDATE import_jobs
            SET status = $2,
                finished_at = NOW(),
                processed_records = $4,
                total_records = $4,
                error_message = NULL
            WHERE id = $1 AND status = ANY($3)
            "#,
        )
        .bind(id)
        .bind(to.to_string())
        .bind(predecessor_labels(to))
        .bind(records)
        .execute(&self.pool)
        .await?;

        self.check_transition(id, to, result).await
    }

    async fn mark_failed(&self, id: Uuid, message: &str) -> Result<(), StoreError> {
        let to = ImportJobStatus::Failed;
        let result = sqlx::query(
            r#"
            UPDATE import_jobs
            SET status = $2,
                finished_at = NOW(),
                processed_records = NULL,
                total_records = NULL,
                error_message = $4
            WHERE id = $1 AND status = ANY($3)
            "#,
        )
        .bind(id)
        .bind(to.to_string())
        .bind(predecessor_labels(to))
        .bind(truncate_error_message(message))
        .execute(&self.pool)
        .await?;

        self.check_transition(id, to, result).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
