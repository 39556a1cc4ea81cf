use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::ImportSettings;
use crate::db::{JobStore, PersonBatchWriter, PersonStore};
use crate::services::admission::AdmissionPermit;
use crate::services::csv_row::{CsvLayout, LayoutError};
use crate::services::import::ImportError;
use crate::services::registry::PersonTypeRegistry;
use crate::services::storage::ScratchFile;

/// Floor for the measured import duration so tiny files don't divide by zero.
const MIN_ELAPSED_SECS: f64 = 1e-3;

/// Everything a worker needs to process one job. Owning the task means owning
/// the job's admission permit and its scratch file.
#[derive(Debug)]
pub struct ImportTask {
    pub job_id: Uuid,
    pub scratch: ScratchFile,
    pub permit: AdmissionPermit,
}

/// Outcome of a committed import transaction.
#[derive(Debug, Clone, Copy)]
pub struct ImportSummary {
    pub rows: i32,
    pub elapsed: Duration,
}

impl ImportSummary {
    /// Rows per second over the parse + persist phase.
    pub fn throughput(&self) -> f64 {
        self.rows as f64 / self.elapsed.as_secs_f64().max(MIN_ELAPSED_SECS)
    }
}

/// The batch engine: turns a staged CSV into persisted persons and drives the
/// job through its lifecycle.
pub struct ImportWorker {
    jobs: Arc<dyn JobStore>,
    persons: Arc<dyn PersonStore>,
    registry: Arc<PersonTypeRegistry>,
    batch_size: usize,
    minimum_tps: f64,
}

impl ImportWorker {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        persons: Arc<dyn PersonStore>,
        registry: Arc<PersonTypeRegistry>,
        settings: &ImportSettings,
    ) -> Self {
        Self {
            jobs,
            persons,
            registry,
            batch_size: settings.effective_batch_size(),
            minimum_tps: settings.minimum_tps,
        }
    }

    /// Process one job start to finish. Never returns an error: every failure
    /// ends up on the job as `FAILED`. The permit is released and the scratch
    /// file deleted whatever the outcome.
    pub async fn process(&self, task: ImportTask) {
        let ImportTask {
            job_id,
            scratch,
            permit,
        } = task;

        info!(job_id = %job_id, path = %scratch.path().display(), "Processing import job");

        match self.run(job_id, scratch.path()).await {
            Ok(summary) => self.finish_completed(job_id, summary).await,
            Err(e) => self.finish_failed(job_id, &e.to_string()).await,
        }

        permit.release();

        if let Err(e) = scratch.delete() {
            warn!(job_id = %job_id, error = %e, "Could not delete scratch file");
        }
    }

    async fn run(&self, job_id: Uuid, path: &Path) -> Result<ImportSummary, ImportError> {
        self.jobs.mark_in_progress(job_id).await?;
        self.import_file(path).await
    }

    /// Parse and persist a whole file inside one import transaction.
    ///
    /// Either every row is committed or, on any error, nothing is.
    pub async fn import_file(&self, path: &Path) -> Result<ImportSummary, ImportError> {
        let start = Instant::now();
        let mut tx = self.persons.begin().await?;

        let rows = match self.import_rows(path, tx.as_mut()).await {
            Ok(rows) => rows,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback of import transaction failed");
                }
                return Err(e);
            }
        };
        tx.commit().await?;

        Ok(ImportSummary {
            rows,
            elapsed: start.elapsed(),
        })
    }

    async fn import_rows(
        &self,
        path: &Path,
        tx: &mut dyn PersonBatchWriter,
    ) -> Result<i32, ImportError> {
        let file = tokio::fs::File::open(path).await.map_err(read_failure)?;
        let mut lines = BufReader::new(file).lines();

        let header = lines
            .next_line()
            .await
            .map_err(read_failure)?
            .ok_or(LayoutError::Empty)?;
        let layout = CsvLayout::parse(&header)?;

        let mut batch = Vec::with_capacity(self.batch_size);
        let mut processed = 0i32;
        let mut line_no = 1usize;

        while let Some(line) = lines.next_line().await.map_err(read_failure)? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            let row = layout.row(&line, line_no)?;
            batch.push(self.registry.decode(&row)?);
            processed = next_record_count(processed)?;

            if batch.len() >= self.batch_size {
                tx.insert_batch(&batch).await?;
                batch.clear();
            }
        }

        if !batch.is_empty() {
            tx.insert_batch(&batch).await?;
        }

        Ok(processed)
    }

    async fn finish_completed(&self, job_id: Uuid, summary: ImportSummary) {
        let tps = summary.throughput();

        if let Err(e) = self.jobs.mark_completed(job_id, summary.rows).await {
            error!(job_id = %job_id, error = %e, "Failed to record job completion");
            return;
        }

        metrics::counter!("import_jobs_completed_total").increment(1);
        metrics::counter!("import_rows_persisted_total").increment(summary.rows as u64);
        metrics::histogram!("import_processing_seconds").record(summary.elapsed.as_secs_f64());
        metrics::gauge!("import_throughput_rows_per_second").set(tps);

        info!(
            job_id = %job_id,
            rows = summary.rows,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            tps = tps,
            "Import job completed"
        );

        if tps < self.minimum_tps {
            warn!(
                job_id = %job_id,
                tps = tps,
                minimum_tps = self.minimum_tps,
                "Import throughput below configured minimum"
            );
        }
    }

    /// Route a job to `FAILED`. Used for worker errors and for jobs that never
    /// reached a worker.
    pub async fn finish_failed(&self, job_id: Uuid, message: &str) {
        error!(job_id = %job_id, error = %message, "Import job failed");
        metrics::counter!("import_jobs_failed_total").increment(1);

        if let Err(e) = self.jobs.mark_failed(job_id, message).await {
            error!(job_id = %job_id, error = %e, "Failed to record job failure");
        }
    }
}

/// Count one more record; a file may hold at most `i32::MAX` of them.
fn next_record_count(processed: i32) -> Result<i32, ImportError> {
    processed.checked_add(1).ok_or_else(|| {
        ImportError::Processing(format!(
            "Import file exceeds the maximum of {} records",
            i32::MAX
        ))
    })
}

fn read_failure(e: std::io::Error) -> ImportError {
    ImportError::Processing(format!("Failed to read CSV file: {}", e))
}

/// In-process pool: a bounded hand-off queue drained by a dispatcher that
/// runs each job on its own task.
#[derive(Clone)]
pub struct WorkerPool {
    sender: mpsc::Sender<ImportTask>,
}

impl WorkerPool {
    /// Spawn the dispatcher. Must be called from within a tokio runtime.
    pub fn start(worker: Arc<ImportWorker>, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<ImportTask>(capacity.max(1));

        tokio::spawn(async move {
            while let Some(task) = receiver.recv().await {
                tokio::spawn(supervise(Arc::clone(&worker), task));
            }
        });

        Self { sender }
    }

    /// Hand a task to the pool. On failure the task, permit included, comes
    /// back to the caller.
    pub fn submit(&self, task: ImportTask) -> Result<(), ImportTask> {
        self.sender.try_send(task).map_err(|err| match err {
            TrySendError::Full(task) | TrySendError::Closed(task) => task,
        })
    }
}

/// Run one task and make sure a panic still leaves the job terminal.
async fn supervise(worker: Arc<ImportWorker>, task: ImportTask) {
    let job_id = task.job_id;
    let handle = tokio::spawn({
        let worker = Arc::clone(&worker);
        async move { worker.process(task).await }
    });

    if let Err(e) = handle.await {
        if e.is_panic() {
            worker
                .finish_failed(job_id, "Import worker terminated unexpectedly")
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{MemoryJobStore, MemoryPersonStore};
    use crate::models::job::{ImportJobStatus, NewImportJob};
    use metrics_exporter_prometheus::PrometheusBuilder;

    fn worker(jobs: &MemoryJobStore) -> ImportWorker {
        ImportWorker::new(
            Arc::new(jobs.clone()),
            Arc::new(MemoryPersonStore::new()),
            Arc::new(PersonTypeRegistry::with_defaults()),
            &ImportSettings::default(),
        )
    }

    fn new_job() -> NewImportJob {
        NewImportJob {
            file_name: "persons.csv".to_string(),
            file_size: 10,
            content_type: None,
        }
    }

    /// Run `finish_completed` on a job, optionally started first, and return
    /// the rendered metrics plus the job's final status.
    fn complete_with_recorder(start_first: bool) -> (String, ImportJobStatus) {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let jobs = MemoryJobStore::new();
        let worker = worker(&jobs);

        let status = metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let job = jobs.create(new_job()).await.unwrap();
                if start_first {
                    jobs.mark_in_progress(job.id).await.unwrap();
                }
                let summary = ImportSummary {
                    rows: 3,
                    elapsed: Duration::from_millis(10),
                };
                worker.finish_completed(job.id, summary).await;
                jobs.find(job.id).await.unwrap().unwrap().status
            })
        });

        (handle.render(), status)
    }

    #[test]
    fn test_completion_metrics_recorded_after_transition() {
        let (rendered, status) = complete_with_recorder(true);
        assert_eq!(status, ImportJobStatus::Completed);
        assert!(rendered.contains("import_jobs_completed_total 1"), "{rendered}");
        assert!(rendered.contains("import_rows_persisted_total 3"), "{rendered}");
    }

    #[test]
    fn test_rejected_completion_records_no_metrics() {
        // a PENDING job cannot move to COMPLETED
        let (rendered, status) = complete_with_recorder(false);
        assert_eq!(status, ImportJobStatus::Pending);
        assert!(!rendered.contains("import_jobs_completed_total"), "{rendered}");
        assert!(!rendered.contains("import_rows_persisted_total"), "{rendered}");
    }

    #[test]
    fn test_record_count_overflow_is_an_error() {
        assert_eq!(next_record_count(41).unwrap(), 42);
        let err = next_record_count(i32::MAX).unwrap_err();
        assert!(matches!(err, ImportError::Processing(ref m) if m.contains("maximum")));
    }

    #[test]
    fn test_throughput_uses_elapsed_floor() {
        let summary = ImportSummary {
            rows: 5,
            elapsed: Duration::ZERO,
        };
        assert_eq!(summary.throughput(), 5000.0);

        let summary = ImportSummary {
            rows: 200,
            elapsed: Duration::from_secs(2),
        };
        assert_eq!(summary.throughput(), 100.0);
    }
}
