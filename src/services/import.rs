use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ImportSettings;
use crate::db::{JobStore, PersonStore, StoreError};
use crate::models::job::{ImportJob, NewImportJob};
use crate::services::admission::AdmissionController;
use crate::services::csv_row::{DecodeError, LayoutError};
use crate::services::registry::PersonTypeRegistry;
use crate::services::storage::{ScratchStorage, StorageError};
use crate::services::worker::{ImportTask, ImportWorker, WorkerPool};

const DEFAULT_FILE_NAME: &str = "upload.csv";

/// A file received by the submission endpoint.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("{0}")]
    Validation(String),

    #[error("Maximum number of concurrent imports reached ({limit})")]
    ConcurrencyExhausted { limit: usize },

    #[error("{0}")]
    Processing(String),

    #[error("Import job with id {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LayoutError> for ImportError {
    fn from(e: LayoutError) -> Self {
        ImportError::Processing(e.to_string())
    }
}

impl From<DecodeError> for ImportError {
    fn from(e: DecodeError) -> Self {
        ImportError::Processing(e.to_string())
    }
}

impl From<StorageError> for ImportError {
    fn from(e: StorageError) -> Self {
        ImportError::Processing(e.to_string())
    }
}

/// Upload & staging front of the import pipeline.
pub struct ImportService {
    jobs: Arc<dyn JobStore>,
    admission: AdmissionController,
    storage: ScratchStorage,
    worker: Arc<ImportWorker>,
    pool: WorkerPool,
}

impl ImportService {
    /// Wire the pipeline and start its worker pool on the current runtime.
    pub fn new(
        jobs: Arc<dyn JobStore>,
        persons: Arc<dyn PersonStore>,
        registry: PersonTypeRegistry,
        settings: ImportSettings,
    ) -> Self {
        let worker = Arc::new(ImportWorker::new(
            Arc::clone(&jobs),
            persons,
            Arc::new(registry),
            &settings,
        ));
        let pool = WorkerPool::start(Arc::clone(&worker), settings.effective_queue_capacity());

        Self {
            jobs,
            admission: AdmissionController::new(settings.max_concurrent_imports),
            storage: ScratchStorage::new(settings.scratch_dir.clone()),
            worker,
            pool,
        }
    }

    /// Admit an upload, stage it, and queue it for asynchronous processing.
    ///
    /// Returns as soon as the job is queued; the outcome is only visible
    /// through [`get_status`](Self::get_status).
    pub async fn start_import(&self, upload: UploadedFile) -> Result<ImportJob, ImportError> {
        if upload.bytes.is_empty() {
            return Err(ImportError::Validation(
                "Uploaded file must not be empty".to_string(),
            ));
        }

        let Some(permit) = self.admission.try_acquire() else {
            metrics::counter!("import_jobs_rejected_total", "reason" => "concurrency").increment(1);
            return Err(ImportError::ConcurrencyExhausted {
                limit: self.admission.limit().unwrap_or_default(),
            });
        };

        let job = self
            .jobs
            .create(NewImportJob {
                file_name: upload
                    .file_name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
                file_size: upload.bytes.len() as i64,
                content_type: upload.content_type,
            })
            .await?;

        let scratch = match self.storage.stage(job.id, upload.bytes).await {
            Ok(scratch) => scratch,
            Err(e) => {
                permit.release();
                let err = ImportError::from(e);
                self.worker.finish_failed(job.id, &err.to_string()).await;
                return Err(err);
            }
        };

        let task = ImportTask {
            job_id: job.id,
            scratch,
            permit,
        };

        if let Err(returned) = self.pool.submit(task) {
            let ImportTask {
                job_id,
                scratch,
                permit,
            } = returned;
            permit.release();
            if let Err(e) = scratch.delete() {
                warn!(job_id = %job_id, error = %e, "Could not delete scratch file");
            }
            let err = ImportError::Processing("Import worker pool is not accepting jobs".to_string());
            self.worker.finish_failed(job_id, &err.to_string()).await;
            return Err(err);
        }

        metrics::counter!("import_jobs_submitted_total").increment(1);
        info!(
            job_id = %job.id,
            file_name = %job.file_name,
            file_size = job.file_size,
            "Import job queued"
        );

        Ok(job)
    }

    pub async fn get_status(&self, job_id: Uuid) -> Result<ImportJob, ImportError> {
        self.jobs
            .find(job_id)
            .await?
            .ok_or(ImportError::NotFound(job_id))
    }
}
