//! Test helper utilities: an in-memory import pipeline and polling helpers

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::{sleep, Instant};
use uuid::Uuid;

use staff_import::config::ImportSettings;
use staff_import::db::memory::{MemoryJobStore, MemoryPersonStore};
use staff_import::db::{PersonBatchWriter, PersonStore, StoreError};
use staff_import::models::job::ImportJob;
use staff_import::models::person::PersonRecord;
use staff_import::services::import::{ImportError, ImportService, UploadedFile};
use staff_import::services::registry::PersonTypeRegistry;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// A fully wired pipeline backed by in-memory stores and a private scratch dir.
pub struct TestPipeline {
    pub service: Arc<ImportService>,
    pub jobs: MemoryJobStore,
    pub persons: MemoryPersonStore,
    pub batches: BatchLog,
    pub scratch: TempDir,
}

impl TestPipeline {
    pub fn new() -> Self {
        Self::with(|_| {}, PersonTypeRegistry::with_defaults())
    }

    pub fn with_settings(configure: impl FnOnce(&mut ImportSettings)) -> Self {
        Self::with(configure, PersonTypeRegistry::with_defaults())
    }

    pub fn with(configure: impl FnOnce(&mut ImportSettings), registry: PersonTypeRegistry) -> Self {
        let scratch = TempDir::new().expect("Failed to create scratch dir");
        let mut settings = ImportSettings {
            scratch_dir: scratch.path().to_path_buf(),
            ..ImportSettings::default()
        };
        configure(&mut settings);

        let jobs = MemoryJobStore::new();
        let persons = MemoryPersonStore::new();
        let batches = BatchLog::default();
        let recording = RecordingPersonStore {
            inner: persons.clone(),
            log: batches.clone(),
        };

        let service = ImportService::new(
            Arc::new(jobs.clone()),
            Arc::new(recording),
            registry,
            settings,
        );

        Self {
            service: Arc::new(service),
            jobs,
            persons,
            batches,
            scratch,
        }
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch.path().to_path_buf()
    }

    /// Submit, retrying while a previous job still holds the only permit.
    pub async fn submit_when_admitted(&self, upload: UploadedFile) -> ImportJob {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        loop {
            match self.service.start_import(upload.clone()).await {
                Ok(job) => return job,
                Err(ImportError::ConcurrencyExhausted { .. }) if Instant::now() < deadline => {
                    sleep(POLL_INTERVAL).await;
                }
                Err(e) => panic!("Submission failed: {e}"),
            }
        }
    }

    /// Poll until the job reaches COMPLETED or FAILED.
    pub async fn wait_for_terminal(&self, job_id: Uuid) -> ImportJob {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        loop {
            let job = self
                .service
                .get_status(job_id)
                .await
                .expect("Job should exist");
            if job.status.is_terminal() {
                return job;
            }
            assert!(
                Instant::now() < deadline,
                "Job {job_id} did not finish in time, last status {}",
                job.status
            );
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Submit a CSV and wait for its outcome.
    pub async fn run_import(&self, csv: &str) -> ImportJob {
        let job = self.submit_when_admitted(csv_upload(csv)).await;
        self.wait_for_terminal(job.id).await
    }

    /// Files currently sitting in the scratch dir.
    pub fn scratch_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.scratch.path())
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default()
    }
}

pub fn csv_upload(csv: &str) -> UploadedFile {
    UploadedFile {
        file_name: Some("persons.csv".to_string()),
        content_type: Some("text/csv".to_string()),
        bytes: csv.as_bytes().to_vec(),
    }
}

/// Sizes of every `insert_batch` call, in order.
#[derive(Clone, Default)]
pub struct BatchLog(Arc<Mutex<Vec<usize>>>);

impl BatchLog {
    pub fn sizes(&self) -> Vec<usize> {
        self.0.lock().clone()
    }
}

struct RecordingPersonStore {
    inner: MemoryPersonStore,
    log: BatchLog,
}

#[async_trait]
impl PersonStore for RecordingPersonStore {
    async fn begin(&self) -> Result<Box<dyn PersonBatchWriter>, StoreError> {
        Ok(Box::new(RecordingWriter {
            inner: self.inner.begin().await?,
            log: self.log.clone(),
        }))
    }

    async fn count(&self) -> Result<i64, StoreError> {
        self.inner.count().await
    }
}

struct RecordingWriter {
    inner: Box<dyn PersonBatchWriter>,
    log: BatchLog,
}

#[async_trait]
impl PersonBatchWriter for RecordingWriter {
    async fn insert_batch(&mut self, batch: &[PersonRecord]) -> Result<(), StoreError> {
        self.log.0.lock().push(batch.len());
        self.inner.insert_batch(batch).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.rollback().await
    }
}
