use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{ImportJob, ImportJobStatus};

/// Job descriptor returned by the submission and status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobResponse {
    pub id: Uuid,
    pub file_name: String,
    pub file_size: i64,
    pub content_type: Option<String>,
    pub status: ImportJobStatus,
    pub total_records: Option<i32>,
    pub processed_records: Option<i32>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<ImportJob> for ImportJobResponse {
    fn from(job: ImportJob) -> Self {
        Self {
            id: job.id,
            file_name: job.file_name,
            file_size: job.file_size,
            content_type: job.content_type,
            status: job.status,
            total_records: job.total_records,
            processed_records: job.processed_records,
            error_message: job.error_message,
            created_at: job.created_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
        }
    }
}

/// Error body for every failed API call.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}
